//! Per-post image localization

use super::fetcher::{FetchError, ImageFetcher};
use super::format::detect_format;
use crate::pipeline::Storage;
use crate::types::{ImageMap, ImageReference, ImageRole, ImageTarget};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Settings for [`ImageLocalizer`]
#[derive(Debug, Clone)]
pub struct LocalizerConfig {
    /// Name of the images area below the output root
    pub images_dir: String,
    /// Maximum concurrent downloads across all posts
    pub max_concurrent: usize,
    /// Largest accepted image
    pub max_image_bytes: usize,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            images_dir: "images".to_string(),
            max_concurrent: 4,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Download outcome counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImageCounts {
    pub downloaded: usize,
    pub failed: usize,
}

/// One unique URL of a post with its local file stem
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedImage {
    url: String,
    stem: String,
}

/// Assign file stems to the unique URLs of a post.
///
/// The first occurrence of a URL decides its role. Covers are `cover`,
/// inline images `image-<n>` numbered among the post's unique inline URLs.
fn plan_images(references: &[ImageReference]) -> Vec<PlannedImage> {
    let mut planned: Vec<PlannedImage> = Vec::new();
    let mut covers = 0;
    let mut inlines = 0;

    for reference in references {
        if planned.iter().any(|p| p.url == reference.url) {
            continue;
        }
        let stem = match reference.role {
            ImageRole::Cover => {
                covers += 1;
                if covers == 1 {
                    "cover".to_string()
                } else {
                    format!("cover-{}", covers)
                }
            }
            ImageRole::Inline => {
                inlines += 1;
                format!("image-{}", inlines)
            }
        };
        planned.push(PlannedImage {
            url: reference.url.clone(),
            stem,
        });
    }

    planned
}

/// Downloads a post's images and maps each source URL to its target.
///
/// Failures are isolated per URL and map the URL to itself. A run-wide
/// ledger keyed by (post slug, URL) makes repeated localization of the same
/// post reuse earlier downloads.
pub struct ImageLocalizer {
    fetcher: Option<Arc<dyn ImageFetcher>>,
    storage: Arc<dyn Storage>,
    config: LocalizerConfig,
    semaphore: Arc<Semaphore>,
    ledger: Mutex<HashMap<(String, String), ImageTarget>>,
    downloaded: AtomicUsize,
    failed: AtomicUsize,
}

impl ImageLocalizer {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, storage: Arc<dyn Storage>, config: LocalizerConfig) -> Self {
        Self::build(Some(fetcher), storage, config)
    }

    /// Localizer that keeps every URL remote and never touches the network
    pub fn disabled(storage: Arc<dyn Storage>) -> Self {
        Self::build(None, storage, LocalizerConfig::default())
    }

    fn build(
        fetcher: Option<Arc<dyn ImageFetcher>>,
        storage: Arc<dyn Storage>,
        config: LocalizerConfig,
    ) -> Self {
        let permits = config.max_concurrent.max(1);
        Self {
            fetcher,
            storage,
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            ledger: Mutex::new(HashMap::new()),
            downloaded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.fetcher.is_some()
    }

    pub fn counts(&self) -> ImageCounts {
        ImageCounts {
            downloaded: self.downloaded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Map every referenced URL of one post to its local or remote target
    pub async fn localize(&self, post_slug: &str, references: &[ImageReference]) -> ImageMap {
        let Some(fetcher) = &self.fetcher else {
            return references
                .iter()
                .map(|r| (r.url.clone(), ImageTarget::Remote(r.url.clone())))
                .collect();
        };

        let planned = plan_images(references);
        let tasks = planned.into_iter().map(|image| async move {
            let target = self.localize_one(fetcher.as_ref(), post_slug, &image).await;
            (image.url, target)
        });

        join_all(tasks).await.into_iter().collect()
    }

    async fn localize_one(
        &self,
        fetcher: &dyn ImageFetcher,
        post_slug: &str,
        image: &PlannedImage,
    ) -> ImageTarget {
        let key = (post_slug.to_string(), image.url.clone());
        if let Some(existing) = self.ledger.lock().get(&key) {
            debug!("Reusing {} for post {}", existing.as_str(), post_slug);
            return existing.clone();
        }

        let target = match self.download_and_store(fetcher, post_slug, image).await {
            Ok(relative) => {
                self.downloaded.fetch_add(1, Ordering::Relaxed);
                ImageTarget::Local(relative)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(post = %post_slug, url = %image.url, "Image download failed, keeping remote URL: {}", e);
                ImageTarget::Remote(image.url.clone())
            }
        };

        self.ledger.lock().insert(key, target.clone());
        target
    }

    /// Returns the path to reference from the rendered document
    async fn download_and_store(
        &self,
        fetcher: &dyn ImageFetcher,
        post_slug: &str,
        image: &PlannedImage,
    ) -> Result<String, LocalizeError> {
        let fetched = {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| LocalizeError::Cancelled)?;
            fetcher.download(&image.url).await?
        };

        if fetched.bytes.is_empty() {
            return Err(FetchError::Empty.into());
        }
        if fetched.bytes.len() > self.config.max_image_bytes {
            return Err(FetchError::ContentTooLarge(fetched.bytes.len()).into());
        }

        let format = detect_format(fetched.content_type.as_deref(), &image.url)
            .map_err(FetchError::Unsupported)?;
        let file_name = format!("{}.{}", image.stem, format.extension());

        let relative: PathBuf = [self.config.images_dir.as_str(), "posts", post_slug, file_name.as_str()]
            .iter()
            .collect();
        self.storage.write(&relative, &fetched.bytes)?;

        debug!("Stored {} as {}", image.url, relative.display());
        Ok(format!(
            "../{}/posts/{}/{}",
            self.config.images_dir, post_slug, file_name
        ))
    }
}

#[derive(Debug, thiserror::Error)]
enum LocalizeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] crate::pipeline::StorageError),
    #[error("download slots closed")]
    Cancelled,
}
