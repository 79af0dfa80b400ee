//! Metadata header emitted as YAML front matter
//!
//! Field order is the declaration order below; absent optional fields are
//! left out. Multi-line text comes out as a literal block.

use chrono::NaiveDate;
use serde::Serialize;

/// Front matter of one rendered post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontMatter {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication date; drafts carry `draft: true` instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDate>,
    pub status: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
}

impl FrontMatter {
    /// Emit the header between `---` fences, ending with a newline
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("---\n{}---\n", yaml))
    }
}

/// Header text with `\r\n` and lone `\r` line breaks turned into `\n`
pub fn header_text(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> FrontMatter {
        FrontMatter {
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            draft: Some(true),
            status: vec!["draft".to_string()],
            ..FrontMatter::default()
        }
    }

    fn parse_back(yaml: &str) -> serde_yaml::Mapping {
        let inner = yaml
            .strip_prefix("---\n")
            .and_then(|s| s.strip_suffix("---\n"))
            .unwrap();
        serde_yaml::from_str(inner).unwrap()
    }

    fn description_of(yaml: &str) -> String {
        parse_back(yaml)["description"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_fenced_and_ordered() {
        let mut h = header();
        h.subtitle = Some("Sub".into());
        h.reading_time = Some(5);
        h.tags = vec!["rust".into(), "web_dev".into()];
        let yaml = h.to_yaml().unwrap();

        assert!(yaml.starts_with("---\ntitle: Hello\n"));
        assert!(yaml.ends_with("---\n"));

        let keys: Vec<_> = parse_back(&yaml)
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        assert_eq!(keys, vec!["title", "subtitle", "slug", "draft", "status", "tags", "reading_time"]);
    }

    #[test]
    fn test_absent_fields_omitted_and_empty_tags_kept() {
        let yaml = header().to_yaml().unwrap();
        assert!(!yaml.contains("description"));
        assert!(!yaml.contains("date"));
        assert!(yaml.contains("tags: []"));
        assert!(yaml.contains("draft: true"));
    }

    #[test]
    fn test_multi_line_uses_literal_block() {
        let mut h = header();
        h.description = Some("line one\nline two".into());
        let yaml = h.to_yaml().unwrap();
        assert!(yaml.contains("description: |"), "{}", yaml);
        assert_eq!(description_of(&yaml), "line one\nline two");
    }

    #[test]
    fn test_multi_line_round_trips() {
        let cases = [
            "line one\nline two",
            "ends with newline\n",
            "keeps\n\nblank lines\n\n\n",
            "  indented first\nsecond",
            "\nleading blank line",
            "# not a comment\n- not a list\nkey: not a map",
            "tricky: 'quotes' \\ back \"double\"",
            "unicode ✓ ünïcode\nnext",
        ];
        for case in cases {
            let mut h = header();
            h.description = Some(case.to_string());
            let yaml = h.to_yaml().unwrap();
            assert_eq!(description_of(&yaml), case, "yaml was:\n{}", yaml);
        }
    }

    #[test]
    fn test_windows_line_breaks_become_literal_block() {
        let mut h = header();
        h.description = Some(header_text("line one\r\nline two\r\n"));
        let yaml = h.to_yaml().unwrap();
        assert!(yaml.contains("description: |"), "{}", yaml);
        assert!(!yaml.contains("\\r"));
        assert_eq!(description_of(&yaml), "line one\nline two\n");
    }

    #[test]
    fn test_dates_are_plain_days() {
        let mut h = header();
        h.draft = None;
        h.date = NaiveDate::from_ymd_opt(2023, 1, 5);
        let parsed = parse_back(&h.to_yaml().unwrap());
        assert_eq!(parsed["date"].as_str(), Some("2023-01-05"));
    }

    #[test]
    fn test_header_text_normalizes_breaks() {
        assert_eq!(header_text("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(header_text("plain"), "plain");
    }
}
