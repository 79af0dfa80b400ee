//! Configuration for h2o

mod enrichment;
mod images;
mod logging;
mod output;

pub use enrichment::{EnrichmentConfig, DEFAULT_API_KEY_ENV};
pub use images::ImagesConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use output::OutputConfig;

use crate::export::is_path_safe;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "h2o.toml";

/// Scheduling of the per-post work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Posts resolved concurrently
    #[serde(default = "default_post_concurrency")]
    pub post_concurrency: usize,
}

fn default_post_concurrency() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            post_concurrency: default_post_concurrency(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Output layout
        if self.output.root.as_os_str().is_empty() {
            errors.push("output root must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for (key, dir) in self.output.areas() {
            if !is_path_safe(dir) {
                errors.push(format!("{} must be a single directory name, got {:?}", key, dir));
            } else if !seen.insert(dir) {
                errors.push(format!("{} ({:?}) is used by more than one area", key, dir));
            }
        }

        // Enrichment
        if self.enrichment.batch_size == 0 {
            errors.push("enrichment batch_size must be positive".to_string());
        }
        if self.enrichment.batch_size > 100 {
            errors.push("enrichment batch_size must be <= 100".to_string());
        }
        if self.enrichment.timeout_secs == 0 {
            errors.push("enrichment timeout_secs must be positive".to_string());
        }
        match Url::parse(&self.enrichment.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(format!(
                "enrichment endpoint must be an http(s) URL, got {:?}",
                self.enrichment.endpoint
            )),
        }
        if self.enrichment.api_key_env.trim().is_empty() {
            errors.push("enrichment api_key_env must not be empty".to_string());
        }

        // Images
        if self.images.max_concurrent == 0 {
            errors.push("images max_concurrent must be positive".to_string());
        }
        if self.images.max_concurrent > 64 {
            errors.push("images max_concurrent must be <= 64".to_string());
        }
        if self.images.timeout_secs == 0 {
            errors.push("images timeout_secs must be positive".to_string());
        }
        if self.images.max_image_bytes == 0 {
            errors.push("images max_image_bytes must be positive".to_string());
        }

        // Pipeline
        if self.pipeline.post_concurrency == 0 {
            errors.push("pipeline post_concurrency must be positive".to_string());
        }
        if self.pipeline.post_concurrency > 64 {
            errors.push("pipeline post_concurrency must be <= 64".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }

    /// Commented configuration file with the default values
    pub fn default_toml() -> String {
        let config = Config::default();
        format!(
            r#"# h2o configuration

[output]
# Output root; overridden by --output
root = "{root}"
drafts_dir = "{drafts}"
posts_dir = "{posts}"
templates_dir = "{templates}"
images_dir = "{images_dir}"

[enrichment]
# Resolve tag identifiers to names through the GraphQL API
enabled = {enrich}
endpoint = "{endpoint}"
timeout_secs = {enrich_timeout}
batch_size = {batch_size}
# api_key = "..."  (prefer the environment variable below)
api_key_env = "{api_key_env}"

[images]
# Download remote images into the images area
enabled = {images}
timeout_secs = {images_timeout}
max_concurrent = {max_concurrent}
max_image_bytes = {max_image_bytes}

[pipeline]
post_concurrency = {post_concurrency}

[logging]
# text or json
format = "text"
# error, warn, info, debug, trace
level = "{level}"
"#,
            root = config.output.root.display(),
            drafts = config.output.drafts_dir,
            posts = config.output.posts_dir,
            templates = config.output.templates_dir,
            images_dir = config.output.images_dir,
            enrich = config.enrichment.enabled,
            endpoint = config.enrichment.endpoint,
            enrich_timeout = config.enrichment.timeout_secs,
            batch_size = config.enrichment.batch_size,
            api_key_env = config.enrichment.api_key_env,
            images = config.images.enabled,
            images_timeout = config.images.timeout_secs,
            max_concurrent = config.images.max_concurrent,
            max_image_bytes = config.images.max_image_bytes,
            post_concurrency = config.pipeline.post_concurrency,
            level = config.logging.level,
        )
    }
}
