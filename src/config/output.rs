//! Output layout configuration

use crate::render::Layout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where converted documents go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output root
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Area for posts without a publication date
    #[serde(default = "default_drafts_dir")]
    pub drafts_dir: String,
    /// Flat area for published posts
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
}

fn default_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_drafts_dir() -> String {
    "drafts".to_string()
}

fn default_posts_dir() -> String {
    "posts".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_images_dir() -> String {
    "images".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            drafts_dir: default_drafts_dir(),
            posts_dir: default_posts_dir(),
            templates_dir: default_templates_dir(),
            images_dir: default_images_dir(),
        }
    }
}

impl OutputConfig {
    pub fn layout(&self) -> Layout {
        Layout {
            drafts_dir: self.drafts_dir.clone(),
            posts_dir: self.posts_dir.clone(),
            templates_dir: self.templates_dir.clone(),
            images_dir: self.images_dir.clone(),
        }
    }

    /// Area names paired with their config keys
    pub(crate) fn areas(&self) -> [(&'static str, &str); 4] {
        [
            ("drafts_dir", &self.drafts_dir),
            ("posts_dir", &self.posts_dir),
            ("templates_dir", &self.templates_dir),
            ("images_dir", &self.images_dir),
        ]
    }
}
