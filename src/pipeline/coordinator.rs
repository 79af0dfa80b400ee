//! Conversion coordinator that sequences the per-post work

use super::progress::{RunProgress, RunSummary};
use super::storage::{Storage, StorageError};
use crate::enrichment::{SeriesResolver, TagResolver};
use crate::export::ExportReader;
use crate::images::{extract_image_references, ImageLocalizer};
use crate::render::{Area, RenderError, RenderedDocument, Renderer, POST_TEMPLATE};
use crate::types::{PostRecord, ResolvedPost};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single post was not converted
#[derive(Debug, Error)]
pub enum PostError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("write failed: {0}")]
    Write(#[from] StorageError),
}

/// Run options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Stop after this many valid posts
    pub limit: Option<usize>,
    /// Plan writes instead of performing them
    pub dry_run: bool,
    /// Hide the progress bar
    pub quiet: bool,
    /// Posts whose tags and images are resolved at the same time
    pub post_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            limit: None,
            dry_run: false,
            quiet: true,
            post_concurrency: 4,
        }
    }
}

impl PipelineOptions {
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_post_concurrency(mut self, post_concurrency: usize) -> Self {
        self.post_concurrency = post_concurrency.max(1);
        self
    }
}

/// A document a dry run would have written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDocument {
    /// Path relative to the output root
    pub destination: PathBuf,
    pub area: Option<Area>,
    pub title: String,
    pub tags: usize,
    pub bytes: usize,
}

/// Drives one conversion run.
///
/// Tag resolution and image localization for a post run concurrently, and
/// several posts may be in flight at once; documents are still written in
/// export order.
pub struct Pipeline {
    resolver: Arc<TagResolver>,
    series: Arc<SeriesResolver>,
    localizer: Arc<ImageLocalizer>,
    renderer: Renderer,
    storage: Arc<dyn Storage>,
    options: PipelineOptions,
    plan: Mutex<Vec<PlannedDocument>>,
}

impl Pipeline {
    pub fn new(
        resolver: Arc<TagResolver>,
        localizer: Arc<ImageLocalizer>,
        renderer: Renderer,
        storage: Arc<dyn Storage>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            resolver,
            series: Arc::new(SeriesResolver::disabled()),
            localizer,
            renderer,
            storage,
            options,
            plan: Mutex::new(Vec::new()),
        }
    }

    pub fn with_series_resolver(mut self, series: Arc<SeriesResolver>) -> Self {
        self.series = series;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Documents planned by a dry run, in write order
    pub fn plan(&self) -> Vec<PlannedDocument> {
        self.plan.lock().clone()
    }

    /// Convert every post of the export
    pub async fn run(&self, reader: ExportReader) -> RunSummary {
        let entries = reader.entry_count();
        let expected = self.options.limit.map_or(entries, |limit| limit.min(entries));
        info!(
            "Converting up to {} posts from {}{}",
            expected,
            reader.source_name(),
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        self.write_template();

        let progress = RunProgress::new(expected as u64, self.options.quiet);
        let publication_id = reader.publication().id.clone();
        let mut posts = reader.posts(self.options.limit);

        {
            let resolved = stream::iter(posts.by_ref())
                .map(|record| self.resolve_post(record, publication_id.as_deref()))
                .buffered(self.options.post_concurrency.max(1));
            futures::pin_mut!(resolved);

            while let Some(post) = resolved.next().await {
                match self.write_post(&post) {
                    Ok(destination) => {
                        debug!(post_id = %post.record.id, "Converted to {}", destination.display());
                        progress.post_converted(&post.record.title);
                    }
                    Err(e) => {
                        warn!(post_id = %post.record.id, "Failed to convert post: {}", e);
                        progress.post_failed(&post.record.title);
                    }
                }
            }
        }

        progress.finish();

        let stats = posts.stats();
        let images = self.localizer.counts();
        let tags = self.resolver.counts();
        let summary = RunSummary {
            read: stats.read,
            skipped_invalid: stats.skipped_invalid,
            converted: progress.converted(),
            failed: progress.failed(),
            images_downloaded: images.downloaded,
            images_failed: images.failed,
            tags_resolved_via_api: tags.resolved_via_api,
            tags_fallback: tags.fallback,
        };
        info!(
            "Run finished: {} converted, {} failed, {} skipped in {:.1}s",
            summary.converted,
            summary.failed,
            summary.skipped_invalid,
            progress.elapsed_seconds()
        );
        summary
    }

    /// Resolve tags, series and images of one post concurrently
    async fn resolve_post(&self, record: PostRecord, publication_id: Option<&str>) -> ResolvedPost {
        let tag_ids = record.tag_ids();
        let references = extract_image_references(&record);

        let (tags, images, series) = tokio::join!(
            self.resolver.resolve(&tag_ids),
            self.localizer.localize(&record.slug, &references),
            async {
                match &record.series {
                    Some(series) => Some(self.series.resolve(publication_id, series).await),
                    None => None,
                }
            }
        );

        let ordered_tags = record
            .tags
            .iter()
            .filter_map(|id| tags.get(id).cloned())
            .collect();
        ResolvedPost::new(record, ordered_tags, images).with_series(series)
    }

    fn write_post(&self, post: &ResolvedPost) -> Result<PathBuf, PostError> {
        let document = self.renderer.render(post)?;
        self.persist(&document, post.tags.len())?;
        Ok(document.destination)
    }

    fn persist(&self, document: &RenderedDocument, tags: usize) -> Result<(), PostError> {
        let content = document.to_markdown()?;
        if self.options.dry_run {
            self.plan.lock().push(PlannedDocument {
                destination: document.destination.clone(),
                area: Some(document.area),
                title: document.header.title.clone(),
                tags,
                bytes: content.len(),
            });
            return Ok(());
        }
        self.storage.write(&document.destination, content.as_bytes())?;
        Ok(())
    }

    fn write_template(&self) {
        let path = self.renderer.layout().template_path();
        if self.options.dry_run {
            self.plan.lock().push(PlannedDocument {
                destination: path,
                area: None,
                title: "post template".to_string(),
                tags: 0,
                bytes: POST_TEMPLATE.len(),
            });
            return;
        }
        if let Err(e) = self.storage.write(&path, POST_TEMPLATE.as_bytes()) {
            warn!("Failed to write post template: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::{EnrichmentError, SeriesLookup};
    use crate::pipeline::DryRunStorage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::Path;

    /// Rejects writes to one path and records the rest
    struct RejectingStorage {
        rejected: PathBuf,
        inner: DryRunStorage,
    }

    impl Storage for RejectingStorage {
        fn write(&self, path: &Path, content: &[u8]) -> Result<(), StorageError> {
            if path == self.rejected {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.inner.write(path, content)
        }
    }

    struct FixedSeries;

    #[async_trait]
    impl SeriesLookup for FixedSeries {
        async fn publication_series(
            &self,
            publication_id: &str,
        ) -> Result<HashMap<String, String>, EnrichmentError> {
            assert_eq!(publication_id, "pub1");
            Ok(HashMap::from([("s1".to_string(), "Rust Basics".to_string())]))
        }
    }

    fn pipeline(storage: Arc<dyn Storage>, options: PipelineOptions) -> Pipeline {
        Pipeline::new(
            Arc::new(TagResolver::disabled()),
            Arc::new(ImageLocalizer::disabled(storage.clone())),
            Renderer::default(),
            storage,
            options,
        )
    }

    fn export() -> ExportReader {
        ExportReader::from_value(
            json!([
                {"_id": "1", "title": "First", "publishedAt": "2023-01-01T00:00:00Z", "tags": ["t1"]},
                {"_id": "2", "title": "Second"},
                {"_id": "3", "title": "Bad date", "publishedAt": "not a date"},
                {"_id": "4", "title": "Fourth", "publishedAt": "2023-03-01", "tags": ["t1", "t2"]}
            ]),
            "test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_writes_in_order_and_isolates_failures() {
        let storage = Arc::new(DryRunStorage::new());
        let summary = pipeline(storage.clone(), PipelineOptions::default())
            .run(export())
            .await;

        assert_eq!(summary.read, 4);
        assert_eq!(summary.converted, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.tags_fallback, 2);
        assert!(summary.has_failures());

        let paths: Vec<_> = storage.planned().into_iter().map(|w| w.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("templates/post-template.md"),
                PathBuf::from("posts/first.md"),
                PathBuf::from("drafts/second.md"),
                PathBuf::from("posts/fourth.md"),
            ]
        );
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_storage() {
        let storage = Arc::new(DryRunStorage::new());
        let pipeline = pipeline(
            storage.clone(),
            PipelineOptions::default().with_dry_run(true).with_limit(Some(2)),
        );
        let summary = pipeline.run(export()).await;

        assert_eq!(summary.converted, 2);
        assert!(storage.planned().is_empty());

        let plan = pipeline.plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[1].destination, PathBuf::from("posts/first.md"));
        assert_eq!(plan[1].area, Some(Area::Posts));
        assert_eq!(plan[1].title, "First");
        assert_eq!(plan[1].tags, 1);
        assert_eq!(plan[2].area, Some(Area::Drafts));
    }

    #[tokio::test]
    async fn test_write_failure_counts_and_continues() {
        let storage = Arc::new(RejectingStorage {
            rejected: PathBuf::from("drafts/second.md"),
            inner: DryRunStorage::new(),
        });
        let summary = pipeline(storage.clone(), PipelineOptions::default())
            .run(export())
            .await;

        // Second fails to write, Bad date fails to render
        assert_eq!(summary.converted, 2);
        assert_eq!(summary.failed, 2);

        let paths: Vec<_> = storage.inner.planned().into_iter().map(|w| w.path).collect();
        assert!(paths.contains(&PathBuf::from("posts/first.md")));
        assert!(paths.contains(&PathBuf::from("posts/fourth.md")));
        assert!(!paths.contains(&PathBuf::from("drafts/second.md")));
    }

    #[tokio::test]
    async fn test_series_names_resolved_from_publication() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(crate::pipeline::FsStorage::new(temp.path()));
        let pipeline = pipeline(storage, PipelineOptions::default())
            .with_series_resolver(Arc::new(SeriesResolver::new(Arc::new(FixedSeries))));
        let reader = ExportReader::from_value(
            json!({
                "publication": {"_id": "pub1"},
                "posts": [
                    {"_id": "1", "title": "One", "series": "s1"},
                    {"_id": "2", "title": "Two", "series": "s2"}
                ]
            }),
            "test",
        )
        .unwrap();
        let summary = pipeline.run(reader).await;
        assert_eq!(summary.converted, 2);

        let one = std::fs::read_to_string(temp.path().join("drafts/one.md")).unwrap();
        let two = std::fs::read_to_string(temp.path().join("drafts/two.md")).unwrap();
        assert!(one.contains("\nseries: Rust Basics\n"), "{}", one);
        assert!(two.contains("\nseries: Series-s2\n"), "{}", two);
    }
}
