//! Core types shared by the conversion pipeline

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Identifier of a post inside the export
pub type PostId = String;

/// Opaque tag identifier as it appears in the export
pub type TagId = String;

// ============================================================================
// Export records
// ============================================================================

/// A single post as read from the export, after field normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Source identifier (`_id` in the export)
    pub id: PostId,
    /// Post title ("Untitled" when the export has none)
    pub title: String,
    /// Unique, path-safe slug
    pub slug: String,
    /// Raw markup body
    pub body: String,
    /// Tag identifiers in export order, without duplicates
    pub tags: Vec<TagId>,
    /// Cover image URL
    pub cover_image: Option<String>,
    /// Publication timestamp; `None` means the post is a draft
    pub published_at: Option<String>,
    /// Last update timestamp
    pub updated_at: Option<String>,
    /// Short description ("brief" in the export)
    pub description: Option<String>,
    pub subtitle: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub canonical_url: Option<String>,
    /// Reading time in minutes
    pub reading_time: Option<u32>,
    pub series: Option<SeriesRef>,
    /// `false` when the export marks the post inactive
    pub active: bool,
    /// Field whose JSON shape could not be read; such a post fails to render
    pub malformed: Option<String>,
}

/// Series reference as found in the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRef {
    pub id: String,
    /// Name carried inline by newer exports
    pub name: Option<String>,
}

impl SeriesRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl PostRecord {
    /// Create a record with the required fields and everything else empty
    pub fn new(id: impl Into<String>, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            slug: slug.into(),
            body: String::new(),
            tags: Vec::new(),
            cover_image: None,
            published_at: None,
            updated_at: None,
            description: None,
            subtitle: None,
            seo_title: None,
            seo_description: None,
            canonical_url: None,
            reading_time: None,
            series: None,
            active: true,
            malformed: None,
        }
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the tag identifiers
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the cover image URL
    pub fn with_cover_image(mut self, url: impl Into<String>) -> Self {
        self.cover_image = Some(url.into());
        self
    }

    /// Set the publication timestamp
    pub fn with_published_at(mut self, timestamp: impl Into<String>) -> Self {
        self.published_at = Some(timestamp.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the series
    pub fn with_series(mut self, series: SeriesRef) -> Self {
        self.series = Some(series);
        self
    }

    /// A post without a publication timestamp is a draft
    pub fn is_draft(&self) -> bool {
        self.published_at
            .as_deref()
            .map_or(true, |ts| ts.trim().is_empty())
    }

    /// Unique tag identifiers of this post
    pub fn tag_ids(&self) -> BTreeSet<TagId> {
        self.tags.iter().cloned().collect()
    }
}

// ============================================================================
// Images
// ============================================================================

/// Where an image is referenced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Cover,
    Inline,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Cover => f.write_str("cover"),
            ImageRole::Inline => f.write_str("inline"),
        }
    }
}

/// One reference to a remote image inside a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub url: String,
    pub role: ImageRole,
    /// Slug of the post that owns the reference
    pub post_slug: String,
}

impl ImageReference {
    pub fn new(url: impl Into<String>, role: ImageRole, post_slug: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            role,
            post_slug: post_slug.into(),
        }
    }
}

/// Resolved target of an image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageTarget {
    /// Downloaded; path is relative to the rendered document
    Local(String),
    /// Not localized; the original remote URL is kept
    Remote(String),
}

impl ImageTarget {
    /// The reference to write into the document
    pub fn as_str(&self) -> &str {
        match self {
            ImageTarget::Local(path) => path,
            ImageTarget::Remote(url) => url,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ImageTarget::Local(_))
    }
}

/// Mapping from source URL to resolved target
pub type ImageMap = HashMap<String, ImageTarget>;

// ============================================================================
// Tags
// ============================================================================

/// Why a tag ended up with a synthetic name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// Enrichment turned off for this run
    Disabled,
    /// No API credential available
    NoCredential,
    /// The lookup service failed for the batch
    ServiceError(String),
    /// The service answered but did not know the identifier
    NotFound,
    /// The export carries no publication to look series up in
    NoPublication,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Disabled => f.write_str("enrichment disabled"),
            FallbackReason::NoCredential => f.write_str("no API credential"),
            FallbackReason::ServiceError(e) => write!(f, "service error: {}", e),
            FallbackReason::NotFound => f.write_str("unknown to the service"),
            FallbackReason::NoPublication => f.write_str("no publication identifier"),
        }
    }
}

/// Outcome of resolving a single tag or series identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagResolution {
    Resolved(String),
    Fallback { name: String, reason: FallbackReason },
}

/// A tag identifier with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTag {
    pub id: TagId,
    pub resolution: TagResolution,
}

impl ResolvedTag {
    pub fn resolved(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resolution: TagResolution::Resolved(name.into()),
        }
    }

    /// Tag carrying the synthetic name derived from its identifier
    pub fn fallback(id: impl Into<String>, reason: FallbackReason) -> Self {
        let id = id.into();
        Self {
            resolution: TagResolution::Fallback {
                name: fallback_tag_name(&id),
                reason,
            },
            id,
        }
    }

    /// Display name, whichever branch produced it
    pub fn name(&self) -> &str {
        match &self.resolution {
            TagResolution::Resolved(name) => name,
            TagResolution::Fallback { name, .. } => name,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.resolution, TagResolution::Fallback { .. })
    }
}

/// Deterministic display name for a tag that could not be resolved
pub fn fallback_tag_name(id: &str) -> String {
    format!("Tag-{}", id)
}

/// A series identifier with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSeries {
    pub id: String,
    pub resolution: TagResolution,
}

impl ResolvedSeries {
    pub fn resolved(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resolution: TagResolution::Resolved(name.into()),
        }
    }

    pub fn fallback(id: impl Into<String>, reason: FallbackReason) -> Self {
        let id = id.into();
        Self {
            resolution: TagResolution::Fallback {
                name: fallback_series_name(&id),
                reason,
            },
            id,
        }
    }

    pub fn name(&self) -> &str {
        match &self.resolution {
            TagResolution::Resolved(name) => name,
            TagResolution::Fallback { name, .. } => name,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.resolution, TagResolution::Fallback { .. })
    }
}

/// Deterministic display name for a series identifier
pub fn fallback_series_name(id: &str) -> String {
    let short: String = id.chars().take(8).collect();
    format!("Series-{}", short)
}

// ============================================================================
// Resolved posts
// ============================================================================

/// A post with its tags and images resolved, ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedPost {
    pub record: PostRecord,
    /// Resolved tags in the post's tag order
    pub tags: Vec<ResolvedTag>,
    pub images: ImageMap,
    pub series: Option<ResolvedSeries>,
}

impl ResolvedPost {
    pub fn new(record: PostRecord, tags: Vec<ResolvedTag>, images: ImageMap) -> Self {
        Self {
            record,
            tags,
            images,
            series: None,
        }
    }

    pub fn with_series(mut self, series: Option<ResolvedSeries>) -> Self {
        self.series = series;
        self
    }

    /// Series display name: the resolved one, else the export's, else the fallback
    pub fn series_name(&self) -> Option<String> {
        if let Some(series) = &self.series {
            return Some(series.name().to_string());
        }
        self.record.series.as_ref().map(|series| {
            series
                .name
                .clone()
                .unwrap_or_else(|| fallback_series_name(&series.id))
        })
    }

    /// Resolved reference for a source URL; unknown URLs stay remote
    pub fn image_target<'a>(&'a self, url: &'a str) -> &'a str {
        self.images
            .get(url)
            .map(ImageTarget::as_str)
            .unwrap_or(url)
    }
}
