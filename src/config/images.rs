//! Image download configuration

use crate::images::{FetchConfig, LocalizerConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for image localization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Download images at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Concurrent downloads across all posts
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Largest accepted image in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_user_agent() -> String {
    concat!("h2o/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            max_image_bytes: default_max_image_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl ImagesConfig {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_content_size: self.max_image_bytes,
            ..FetchConfig::default()
        }
    }

    pub fn localizer_config(&self, images_dir: &str) -> LocalizerConfig {
        LocalizerConfig {
            images_dir: images_dir.to_string(),
            max_concurrent: self.max_concurrent,
            max_image_bytes: self.max_image_bytes,
        }
    }
}
