//! Document rendering
//!
//! Builds the front matter and body of one post and decides where the
//! document goes. Drafts land in the drafts area and published posts in a
//! flat posts area, both keyed by slug:
//!
//! ```text
//! <output>/
//! ├── drafts/<slug>.md
//! ├── posts/<slug>.md
//! ├── templates/post-template.md
//! └── images/posts/<slug>/...
//! ```
//!
//! The body is passed through unchanged except for image URLs that were
//! localized.

mod body;
mod frontmatter;
mod template;

pub use body::render_body;
pub use frontmatter::{header_text, FrontMatter};
pub use template::{POST_TEMPLATE, TEMPLATE_FILE_NAME};

use crate::export::is_path_safe;
use crate::types::ResolvedPost;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a post could not be rendered
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid {field} timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Slug is not usable as a file name: {0:?}")]
    UnsafeSlug(String),

    #[error("Unexpected field shape: {0}")]
    Malformed(String),

    #[error("Header serialization failed: {0}")]
    Header(#[from] serde_yaml::Error),
}

/// Names of the areas below the output root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub drafts_dir: String,
    pub posts_dir: String,
    pub templates_dir: String,
    pub images_dir: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            drafts_dir: "drafts".to_string(),
            posts_dir: "posts".to_string(),
            templates_dir: "templates".to_string(),
            images_dir: "images".to_string(),
        }
    }
}

impl Layout {
    /// Location of the static template, relative to the output root
    pub fn template_path(&self) -> PathBuf {
        [self.templates_dir.as_str(), TEMPLATE_FILE_NAME].iter().collect()
    }
}

/// Output area of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Drafts,
    Posts,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Drafts => f.write_str("drafts"),
            Area::Posts => f.write_str("posts"),
        }
    }
}

/// A finished document; never changed after construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Path relative to the output root
    pub destination: PathBuf,
    pub area: Area,
    pub header: FrontMatter,
    pub body: String,
}

impl RenderedDocument {
    /// Full file content: header, blank line, body
    pub fn to_markdown(&self) -> Result<String, RenderError> {
        Ok(format!("{}\n{}", self.header.to_yaml()?, self.body))
    }
}

/// Renders resolved posts into documents
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    layout: Layout,
}

impl Renderer {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn render(&self, post: &ResolvedPost) -> Result<RenderedDocument, RenderError> {
        let record = &post.record;
        if let Some(problem) = &record.malformed {
            return Err(RenderError::Malformed(problem.clone()));
        }
        if !is_path_safe(&record.slug) {
            return Err(RenderError::UnsafeSlug(record.slug.clone()));
        }

        let published = match record.published_at.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => Some(parse_date(ts).ok_or_else(|| {
                RenderError::InvalidTimestamp {
                    field: "publishedAt",
                    value: ts.to_string(),
                }
            })?),
            _ => None,
        };
        let updated = match record.updated_at.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => Some(parse_date(ts).ok_or_else(|| {
                RenderError::InvalidTimestamp {
                    field: "updatedAt",
                    value: ts.to_string(),
                }
            })?),
            _ => None,
        };

        // Deactivated posts keep their date but are marked as drafts
        let status = if published.is_some() && record.active {
            "published"
        } else {
            "draft"
        };

        let header = FrontMatter {
            title: header_text(&record.title),
            subtitle: optional_text(record.subtitle.as_deref()),
            slug: record.slug.clone(),
            description: optional_text(record.description.as_deref()),
            date: published,
            draft: published.is_none().then_some(true),
            updated,
            status: vec![status.to_string()],
            tags: normalize_tags(post.tags.iter().map(|t| t.name())),
            series: post.series_name().map(|name| header_text(&name)),
            reading_time: record.reading_time,
            cover_image: record
                .cover_image
                .as_deref()
                .map(str::trim)
                .map(|cover| post.image_target(cover).to_string()),
            seo_title: optional_text(record.seo_title.as_deref()),
            seo_description: optional_text(record.seo_description.as_deref()),
            canonical_url: optional_text(record.canonical_url.as_deref()),
        };

        let (area, dir) = if published.is_some() {
            (Area::Posts, &self.layout.posts_dir)
        } else {
            (Area::Drafts, &self.layout.drafts_dir)
        };
        let file_name = format!("{}.md", record.slug);
        let destination: PathBuf = [dir.as_str(), file_name.as_str()].iter().collect();

        Ok(RenderedDocument {
            destination,
            area,
            header,
            body: render_body(&record.body, &post.images),
        })
    }
}

/// Render with the default layout
pub fn render(post: &ResolvedPost) -> Result<RenderedDocument, RenderError> {
    Renderer::default().render(post)
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(header_text)
}

/// Accepts RFC 3339 timestamps or anything starting with `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Make a tag name usable as a note-tool tag
pub fn normalize_tag(name: &str) -> String {
    name.trim()
        .chars()
        .filter_map(|c| match c {
            ' ' | '.' => Some('_'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Normalize names, dropping empties and duplicates while keeping order
pub fn normalize_tags<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for name in names {
        let tag = normalize_tag(name);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
