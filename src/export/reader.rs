//! Export loading, validation and lazy record iteration

use super::slug::SlugRegistry;
use crate::types::{PostRecord, SeriesRef, TagId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that make the export unusable as a whole
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to read export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed export: {0}")]
    Malformed(String),
}

/// Why a single entry was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    MissingIdentifier,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAnObject => f.write_str("entry is not an object"),
            SkipReason::MissingIdentifier => f.write_str("missing required field '_id'"),
        }
    }
}

/// Publication metadata carried next to the posts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationInfo {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Counters kept while iterating an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStats {
    /// Entries in the export container
    pub read: usize,
    /// Entries rejected by validation
    pub skipped_invalid: usize,
    /// Records handed out by the iterator
    pub emitted: usize,
    /// Emitted records with a field of unexpected shape
    pub malformed: usize,
}

/// Raw post entry as found in the export
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    title: Option<String>,
    slug: Option<String>,
    subtitle: Option<String>,
    brief: Option<String>,
    content_markdown: Option<String>,
    content: Option<String>,
    tags: Option<Vec<Value>>,
    cover_image: Option<String>,
    published_at: Option<String>,
    date_added: Option<String>,
    updated_at: Option<String>,
    read_time_in_minutes: Option<f64>,
    read_time: Option<f64>,
    series: Option<RawSeries>,
    is_active: Option<bool>,
    seo_title: Option<String>,
    seo_description: Option<String>,
    canonical_url: Option<String>,
    #[serde(rename = "originalArticleURL")]
    original_article_url: Option<String>,
}

/// Series as an identifier string or an object with `_id`/`id` and `name`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSeries {
    Id(String),
    Object {
        #[serde(rename = "_id", alias = "id", default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl RawSeries {
    fn into_ref(self) -> Option<SeriesRef> {
        match self {
            RawSeries::Id(id) => non_empty(Some(id)).map(SeriesRef::new),
            RawSeries::Object { id, name } => {
                let name = non_empty(name);
                let id = non_empty(id).or_else(|| name.clone())?;
                Some(SeriesRef { id, name })
            }
        }
    }
}

/// A loaded and structurally validated export
pub struct ExportReader {
    entries: Vec<Value>,
    publication: PublicationInfo,
    source_name: String,
}

impl ExportReader {
    /// Load an export file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content, path.display().to_string())
    }

    /// Parse an export from a JSON string
    pub fn from_json_str(content: &str, source_name: impl Into<String>) -> Result<Self, ExportError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value, source_name)
    }

    /// Validate the top-level container.
    ///
    /// Accepts `{"posts": [...], "publication": {...}}` or a bare array of
    /// posts; anything else is malformed.
    pub fn from_value(value: Value, source_name: impl Into<String>) -> Result<Self, ExportError> {
        let source_name = source_name.into();
        let (entries, publication) = match value {
            Value::Array(entries) => (entries, PublicationInfo::default()),
            Value::Object(mut map) => {
                let posts = map.remove("posts").ok_or_else(|| {
                    ExportError::Malformed("export must contain a 'posts' array".to_string())
                })?;
                let Value::Array(entries) = posts else {
                    return Err(ExportError::Malformed("'posts' must be an array".to_string()));
                };
                let publication = map
                    .remove("publication")
                    .and_then(|p| serde_json::from_value(p).ok())
                    .unwrap_or_default();
                (entries, publication)
            }
            other => {
                return Err(ExportError::Malformed(format!(
                    "expected an object or array at the top level, found {}",
                    json_kind(&other)
                )))
            }
        };

        if entries.is_empty() {
            warn!("No posts found in export {}", source_name);
        }
        info!("Loaded {} entries from {}", entries.len(), source_name);

        Ok(Self {
            entries,
            publication,
            source_name,
        })
    }

    pub fn publication(&self) -> &PublicationInfo {
        &self.publication
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Number of entries in the container, valid or not
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Consume the reader into a lazy sequence of valid records.
    ///
    /// With a `limit`, the sequence ends after that many valid records; the
    /// remaining entries are still validated so `skipped_invalid` always
    /// covers the whole export.
    pub fn posts(self, limit: Option<usize>) -> ExportPosts {
        ExportPosts {
            stats: ReadStats {
                read: self.entries.len(),
                ..ReadStats::default()
            },
            entries: self.entries.into_iter().enumerate(),
            limit,
            slugs: SlugRegistry::new(),
            finished: false,
        }
    }

    /// Walk the whole export and summarize it
    pub fn summarize(self) -> ExportSummary {
        let publication = self.publication.clone();
        let mut posts = self.posts(None);
        let mut summary = ExportSummary {
            publication,
            ..ExportSummary::default()
        };
        let mut tags = BTreeSet::new();

        for post in posts.by_ref() {
            if post.malformed.is_some() {
                continue;
            }
            if post.is_draft() {
                summary.drafts += 1;
            } else {
                summary.published += 1;
            }
            if post.cover_image.is_some() {
                summary.with_cover_image += 1;
            }
            if summary.first_ids.len() < 5 {
                summary.first_ids.push(post.id.clone());
            }
            tags.extend(post.tags);
        }

        let stats = posts.stats();
        summary.entries = stats.read;
        summary.valid = stats.emitted - stats.malformed;
        summary.malformed = stats.malformed;
        summary.invalid = stats.skipped_invalid;
        summary.unique_tags = tags.into_iter().collect();
        summary
    }
}

/// Overview of an export
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub publication: PublicationInfo,
    pub entries: usize,
    pub valid: usize,
    /// Identified posts with a field of unexpected shape; these fail to convert
    pub malformed: usize,
    pub invalid: usize,
    pub drafts: usize,
    pub published: usize,
    pub with_cover_image: usize,
    pub unique_tags: Vec<TagId>,
    pub first_ids: Vec<String>,
}

/// Lazy, finite, non-restartable sequence of post records
pub struct ExportPosts {
    entries: std::iter::Enumerate<std::vec::IntoIter<Value>>,
    limit: Option<usize>,
    slugs: SlugRegistry,
    stats: ReadStats,
    finished: bool,
}

impl ExportPosts {
    /// Counters so far; complete once the iterator returned `None`
    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Validate what is left without emitting it
    fn drain_remaining(&mut self) {
        for (index, entry) in self.entries.by_ref() {
            if let Err(reason) = parse_entry(entry) {
                debug!("Entry {} invalid ({}), beyond limit", index, reason);
                self.stats.skipped_invalid += 1;
            }
        }
    }
}

impl Iterator for ExportPosts {
    type Item = PostRecord;

    fn next(&mut self) -> Option<PostRecord> {
        if self.finished {
            return None;
        }

        if self.limit.is_some_and(|limit| self.stats.emitted >= limit) {
            info!("Reached post limit: {}", self.stats.emitted);
            self.drain_remaining();
            self.finished = true;
            return None;
        }

        for (index, entry) in self.entries.by_ref() {
            match parse_entry(entry) {
                Ok(valid) => {
                    let record = valid.into_record(&mut self.slugs);
                    if let Some(problem) = &record.malformed {
                        warn!(post_id = %record.id, "Unexpected field shape: {}", problem);
                        self.stats.malformed += 1;
                    }
                    self.stats.emitted += 1;
                    return Some(record);
                }
                Err(reason) => {
                    warn!("Skipping post {}: {}", index, reason);
                    self.stats.skipped_invalid += 1;
                }
            }
        }

        self.finished = true;
        None
    }
}

/// Identified entry; the slug is assigned on emission
struct ValidEntry {
    id: String,
    entry: Value,
}

/// Only a non-object or a missing identifier rejects an entry
fn parse_entry(entry: Value) -> Result<ValidEntry, SkipReason> {
    let Value::Object(map) = &entry else {
        return Err(SkipReason::NotAnObject);
    };

    let id = ["_id", "id"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or(SkipReason::MissingIdentifier)?;

    Ok(ValidEntry { id, entry })
}

impl ValidEntry {
    fn into_record(self, slugs: &mut SlugRegistry) -> PostRecord {
        match RawPost::deserialize(&self.entry) {
            Ok(raw) => raw.into_record(self.id, slugs),
            Err(e) => {
                let problem = misshapen_field(&self.entry).unwrap_or_else(|| e.to_string());
                let text = |key: &str| {
                    self.entry
                        .get(key)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                };
                let title = non_empty(text("title")).unwrap_or_else(|| "Untitled".to_string());
                let slug = slugs.assign(text("slug").as_deref(), &title, &self.id);

                let mut record = PostRecord::new(self.id, title, slug);
                record.malformed = Some(problem);
                record
            }
        }
    }
}

/// Name the first field that does not deserialize on its own
fn misshapen_field(entry: &Value) -> Option<String> {
    entry.as_object()?.iter().find_map(|(key, value)| {
        let mut single = Map::new();
        single.insert(key.clone(), value.clone());
        serde_json::from_value::<RawPost>(Value::Object(single))
            .err()
            .map(|e| format!("field '{}': {}", key, e))
    })
}

impl RawPost {
    fn into_record(self, id: String, slugs: &mut SlugRegistry) -> PostRecord {
        let title = non_empty(self.title).unwrap_or_else(|| "Untitled".to_string());
        let slug = slugs.assign(self.slug.as_deref(), &title, &id);

        let body = non_empty(self.content_markdown)
            .or_else(|| non_empty(self.content))
            .unwrap_or_default();

        let mut tags: Vec<TagId> = Vec::new();
        for tag in self.tags.unwrap_or_default() {
            match tag_identifier(&tag) {
                Some(tag_id) if !tags.contains(&tag_id) => tags.push(tag_id),
                Some(_) => {}
                None => debug!("Ignoring unrecognized tag entry in post {}: {}", id, tag),
            }
        }

        let reading_time = self
            .read_time_in_minutes
            .or(self.read_time)
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| m.round() as u32);

        PostRecord {
            title,
            slug,
            body,
            tags,
            cover_image: non_empty(self.cover_image),
            published_at: non_empty(self.published_at).or_else(|| non_empty(self.date_added)),
            updated_at: non_empty(self.updated_at),
            description: non_empty(self.brief),
            subtitle: non_empty(self.subtitle),
            seo_title: non_empty(self.seo_title),
            seo_description: non_empty(self.seo_description),
            canonical_url: non_empty(self.canonical_url).or_else(|| non_empty(self.original_article_url)),
            reading_time,
            series: self.series.and_then(RawSeries::into_ref),
            active: self.is_active.unwrap_or(true),
            malformed: None,
            id,
        }
    }
}

/// Tags are identifier strings, or objects carrying `_id`/`id`
fn tag_identifier(tag: &Value) -> Option<TagId> {
    let id = match tag {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reader(value: Value) -> ExportReader {
        ExportReader::from_value(value, "test").unwrap()
    }

    #[test]
    fn test_rejects_non_container() {
        let err = ExportReader::from_json_str("42", "test").err().unwrap();
        assert!(matches!(err, ExportError::Malformed(_)));

        let err = ExportReader::from_value(json!({"posts": {}}), "test").err().unwrap();
        assert!(matches!(err, ExportError::Malformed(_)));

        let err = ExportReader::from_value(json!({"publication": {}}), "test").err().unwrap();
        assert!(matches!(err, ExportError::Malformed(_)));
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let err = ExportReader::from_json_str("{not json", "test").err().unwrap();
        assert!(matches!(err, ExportError::Json(_)));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = ExportReader::open("/definitely/not/here.json").err().unwrap();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[test]
    fn test_bare_array_accepted() {
        let posts: Vec<_> = reader(json!([{"_id": "1", "title": "One"}])).posts(None).collect();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "one");
    }

    #[test]
    fn test_skips_entries_without_identifier() {
        let mut posts = reader(json!({
            "posts": [
                {"_id": "1", "title": "First"},
                {"title": "No id"},
                "not an object",
                {"_id": "", "title": "Blank id"},
                {"_id": "2", "title": "Second"}
            ]
        }))
        .posts(None);

        let ids: Vec<_> = posts.by_ref().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(
            posts.stats(),
            ReadStats {
                read: 5,
                skipped_invalid: 3,
                emitted: 2,
                malformed: 0
            }
        );
    }

    #[test]
    fn test_wrongly_typed_field_is_kept_as_malformed() {
        let mut posts = reader(json!([
            {"_id": "1", "title": 17, "slug": "first"},
            {"_id": "2", "title": "Fine"}
        ]))
        .posts(Some(1));
        let records: Vec<_> = posts.by_ref().collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].slug, "first");
        assert_eq!(records[0].title, "Untitled");
        let problem = records[0].malformed.as_deref().unwrap();
        assert!(problem.contains("'title'"), "{}", problem);

        let stats = posts.stats();
        assert_eq!(stats.skipped_invalid, 0);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.emitted, 1);
    }

    #[test]
    fn test_series_as_string_or_object() {
        let posts: Vec<_> = reader(json!([
            {"_id": "1", "title": "A", "series": "s1"},
            {"_id": "2", "title": "B", "series": {"_id": "s2", "name": "Rust Basics", "slug": "rust"}},
            {"_id": "3", "title": "C", "series": {"id": "s3"}},
            {"_id": "4", "title": "D", "series": {}},
            {"_id": "5", "title": "E", "series": null}
        ]))
        .posts(None)
        .collect();

        assert_eq!(posts.len(), 5);
        assert!(posts.iter().all(|p| p.malformed.is_none()));
        assert_eq!(posts[0].series, Some(SeriesRef::new("s1")));
        assert_eq!(posts[1].series, Some(SeriesRef::new("s2").with_name("Rust Basics")));
        assert_eq!(posts[2].series, Some(SeriesRef::new("s3")));
        assert_eq!(posts[3].series, None);
        assert_eq!(posts[4].series, None);
    }

    #[test]
    fn test_inactive_flag() {
        let posts: Vec<_> = reader(json!([
            {"_id": "1", "title": "A", "isActive": false},
            {"_id": "2", "title": "B"}
        ]))
        .posts(None)
        .collect();
        assert!(!posts[0].active);
        assert!(posts[1].active);
    }

    #[test]
    fn test_limit_counts_valid_records_only() {
        let mut posts = reader(json!([
            {"title": "invalid first"},
            {"_id": "1", "title": "A"},
            {"_id": "2", "title": "B"},
            {"_id": "3", "title": "C"},
            {"nope": true}
        ]))
        .posts(Some(2));

        let ids: Vec<_> = posts.by_ref().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        let stats = posts.stats();
        assert_eq!(stats.read, 5);
        assert_eq!(stats.skipped_invalid, 2);
        assert_eq!(stats.emitted, 2);
        assert!(posts.next().is_none());
    }

    #[test]
    fn test_field_normalization() {
        let posts: Vec<_> = reader(json!({
            "publication": {"_id": "pub1", "title": "My Blog"},
            "posts": [{
                "_id": "abc",
                "title": "Hello World",
                "brief": "Short",
                "content": "<p>html</p>",
                "contentMarkdown": "# md",
                "tags": ["t1", {"_id": "t2"}, "t1", 5, ""],
                "coverImage": "",
                "dateAdded": "2023-01-01T00:00:00.000Z",
                "readTimeInMinutes": 4.4,
                "originalArticleURL": "https://example.com/orig"
            }]
        }))
        .posts(None)
        .collect();

        let post = &posts[0];
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.body, "# md");
        assert_eq!(post.tags, vec!["t1", "t2"]);
        assert_eq!(post.cover_image, None);
        assert_eq!(post.description.as_deref(), Some("Short"));
        assert_eq!(post.published_at.as_deref(), Some("2023-01-01T00:00:00.000Z"));
        assert_eq!(post.reading_time, Some(4));
        assert_eq!(post.canonical_url.as_deref(), Some("https://example.com/orig"));
    }

    #[test]
    fn test_published_at_preferred_over_date_added() {
        let posts: Vec<_> = reader(json!([{
            "_id": "1",
            "title": "T",
            "publishedAt": "2024-02-02T00:00:00Z",
            "dateAdded": "2023-01-01T00:00:00Z"
        }]))
        .posts(None)
        .collect();
        assert_eq!(posts[0].published_at.as_deref(), Some("2024-02-02T00:00:00Z"));
    }

    #[test]
    fn test_duplicate_slugs_disambiguated() {
        let posts: Vec<_> = reader(json!([
            {"_id": "a1", "title": "Same", "slug": "same"},
            {"_id": "b2", "title": "Same", "slug": "same"}
        ]))
        .posts(None)
        .collect();
        assert_eq!(posts[0].slug, "same");
        assert_eq!(posts[1].slug, "same-b2");
    }

    #[test]
    fn test_summary() {
        let summary = reader(json!({
            "publication": {"_id": "pub1", "title": "My Blog"},
            "posts": [
                {"_id": "1", "title": "A", "tags": ["x", "y"], "publishedAt": "2023-01-01"},
                {"_id": "2", "title": "B", "tags": ["y"], "coverImage": "https://cdn/x.png"},
                {"_id": "3", "title": ["not", "text"]},
                {"title": "invalid"}
            ]
        }))
        .summarize();

        assert_eq!(summary.publication.title.as_deref(), Some("My Blog"));
        assert_eq!(summary.entries, 4);
        assert_eq!(summary.valid, 2);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.drafts, 1);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.with_cover_image, 1);
        assert_eq!(summary.unique_tags, vec!["x", "y"]);
        assert_eq!(summary.first_ids, vec!["1", "2"]);
    }
}
