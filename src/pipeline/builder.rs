//! Assembles a run from configuration and command-line overrides

use super::coordinator::{Pipeline, PipelineOptions};
use super::storage::{DryRunStorage, FsStorage, Storage};
use crate::config::Config;
use crate::enrichment::{HashnodeClient, SeriesLookup, SeriesResolver, TagLookup, TagResolver};
use crate::images::{HttpImageFetcher, ImageFetcher, ImageLocalizer};
use crate::render::Renderer;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-run settings that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub output: Option<PathBuf>,
    pub limit: Option<usize>,
    pub skip_images: bool,
    pub skip_enrichment: bool,
    pub api_key: Option<String>,
    pub dry_run: bool,
    pub quiet: bool,
}

/// A pipeline ready to run, with what the caller needs to report on it
pub struct PreparedRun {
    pub pipeline: Pipeline,
    pub output_root: PathBuf,
    /// Set for dry runs; holds the image writes that were skipped
    pub dry_storage: Option<Arc<DryRunStorage>>,
}

/// Builds a [`Pipeline`], picking the storage and services for the run.
///
/// Services default to the Hashnode API and plain HTTP image downloads;
/// `with_*` swaps in other implementations.
pub struct PipelineBuilder {
    config: Config,
    overrides: RunOverrides,
    tag_lookup: Option<Arc<dyn TagLookup>>,
    series_lookup: Option<Arc<dyn SeriesLookup>>,
    image_fetcher: Option<Arc<dyn ImageFetcher>>,
}

impl PipelineBuilder {
    pub fn new(config: Config, overrides: RunOverrides) -> Self {
        Self {
            config,
            overrides,
            tag_lookup: None,
            series_lookup: None,
            image_fetcher: None,
        }
    }

    pub fn with_tag_lookup(mut self, lookup: Arc<dyn TagLookup>) -> Self {
        self.tag_lookup = Some(lookup);
        self
    }

    pub fn with_series_lookup(mut self, lookup: Arc<dyn SeriesLookup>) -> Self {
        self.series_lookup = Some(lookup);
        self
    }

    pub fn with_image_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.image_fetcher = Some(fetcher);
        self
    }

    pub fn build(mut self) -> Result<PreparedRun> {
        if let Some(output) = self.overrides.output.take() {
            self.config.output.root = output;
        }
        let output_root = self.config.output.root.clone();

        let dry_storage = self.overrides.dry_run.then(|| Arc::new(DryRunStorage::new()));
        let storage: Arc<dyn Storage> = match &dry_storage {
            Some(dry) => dry.clone(),
            None => Arc::new(FsStorage::new(&output_root)),
        };

        let (tags, series) = self.build_resolvers()?;
        let localizer = self.build_localizer(storage.clone())?;

        let options = PipelineOptions::default()
            .with_limit(self.overrides.limit)
            .with_dry_run(self.overrides.dry_run)
            .with_quiet(self.overrides.quiet)
            .with_post_concurrency(self.config.pipeline.post_concurrency);

        let pipeline = Pipeline::new(
            Arc::new(tags),
            Arc::new(localizer),
            Renderer::new(self.config.output.layout()),
            storage,
            options,
        )
        .with_series_resolver(Arc::new(series));

        Ok(PreparedRun {
            pipeline,
            output_root,
            dry_storage,
        })
    }

    fn build_resolvers(&self) -> Result<(TagResolver, SeriesResolver)> {
        let enrichment = &self.config.enrichment;
        if self.overrides.skip_enrichment || !enrichment.enabled {
            info!("Tag enrichment disabled, using fallback tag names");
            return Ok((TagResolver::disabled(), SeriesResolver::disabled()));
        }

        // One client serves both lookups unless both were supplied
        let client = if self.tag_lookup.is_none() || self.series_lookup.is_none() {
            self.hashnode_client()?
        } else {
            None
        };

        let tag_lookup = self
            .tag_lookup
            .clone()
            .or_else(|| client.clone().map(|c| c as Arc<dyn TagLookup>));
        let series_lookup = self
            .series_lookup
            .clone()
            .or_else(|| client.map(|c| c as Arc<dyn SeriesLookup>));

        let tags = match tag_lookup {
            Some(lookup) => TagResolver::new(lookup).with_batch_size(enrichment.batch_size),
            None => TagResolver::without_credential(),
        };
        let series = match series_lookup {
            Some(lookup) => SeriesResolver::new(lookup),
            None => SeriesResolver::without_credential(),
        };
        Ok((tags, series))
    }

    fn hashnode_client(&self) -> Result<Option<Arc<HashnodeClient>>> {
        let enrichment = &self.config.enrichment;
        match enrichment.resolve_api_key(self.overrides.api_key.as_deref()) {
            Some(key) => {
                let client = HashnodeClient::new(enrichment.client_config(key))
                    .context("Failed to create enrichment client")?;
                Ok(Some(Arc::new(client)))
            }
            None => {
                warn!(
                    "No API key found (--api-key, config or ${}), using fallback tag names",
                    enrichment.api_key_env
                );
                Ok(None)
            }
        }
    }

    fn build_localizer(&self, storage: Arc<dyn Storage>) -> Result<ImageLocalizer> {
        let images = &self.config.images;
        if self.overrides.skip_images || !images.enabled {
            info!("Image download disabled, keeping remote image links");
            return Ok(ImageLocalizer::disabled(storage));
        }

        let fetcher: Arc<dyn ImageFetcher> = match &self.image_fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(
                HttpImageFetcher::new(images.fetch_config())
                    .context("Failed to create image fetcher")?,
            ),
        };
        Ok(ImageLocalizer::new(
            fetcher,
            storage,
            images.localizer_config(&self.config.output.images_dir),
        ))
    }
}
