//! Slug derivation and per-export uniqueness

use std::collections::HashSet;

/// Convert text to a URL- and path-friendly slug.
///
/// Lower-cases the input and collapses every run of non-alphanumeric
/// characters into a single `-`, trimming separators at both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Whether a slug can be used as a single file name component
pub fn is_path_safe(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(|c: char| matches!(c, '/' | '\\' | ':'))
        && !slug.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// Assigns slugs so that no two posts of one export share a slug
#[derive(Debug, Default)]
pub struct SlugRegistry {
    seen: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the slug for a post.
    ///
    /// A path-safe export slug is used as-is; otherwise the slug is derived
    /// from the export slug or the title. Collisions get the post identifier
    /// appended.
    pub fn assign(&mut self, provided: Option<&str>, title: &str, id: &str) -> String {
        let mut base = match provided.map(str::trim) {
            Some(slug) if is_path_safe(slug) => slug.to_string(),
            Some(slug) if !slug.is_empty() => slugify(slug),
            _ => slugify(title),
        };
        if base.is_empty() {
            base = id_component(id);
        }

        if self.seen.insert(base.clone()) {
            return base;
        }

        let candidate = format!("{}-{}", base, id_component(id));
        if self.seen.insert(candidate.clone()) {
            return candidate;
        }

        // Same identifier twice in one export
        let mut n = 2;
        loop {
            let numbered = format!("{}-{}", candidate, n);
            if self.seen.insert(numbered.clone()) {
                return numbered;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn id_component(id: &str) -> String {
    let slug = slugify(id);
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust -- async   & await "), "rust-async-await");
        assert_eq!(slugify("Next.js 13"), "next-js-13");
        assert_eq!(slugify("Ünïcode Straße"), "ünïcode-straße");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_path_safety() {
        assert!(is_path_safe("my-post"));
        assert!(!is_path_safe(""));
        assert!(!is_path_safe("../etc"));
        assert!(!is_path_safe("a/b"));
        assert!(!is_path_safe("has space"));
    }

    #[test]
    fn test_provided_slug_kept() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.assign(Some("my-post"), "Whatever", "1"), "my-post");
    }

    #[test]
    fn test_unsafe_slug_is_reslugified() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.assign(Some("../../etc/passwd"), "T", "1"), "etc-passwd");
    }

    #[test]
    fn test_missing_slug_derived_from_title() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.assign(None, "My First Post", "1"), "my-first-post");
        assert_eq!(registry.assign(Some(""), "Second Post", "2"), "second-post");
    }

    #[test]
    fn test_collisions_get_identifier_suffix() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.assign(None, "Same Title", "aaa"), "same-title");
        assert_eq!(registry.assign(None, "Same Title", "bbb"), "same-title-bbb");
        assert_eq!(registry.assign(Some("same-title"), "x", "ccc"), "same-title-ccc");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_empty_title_uses_identifier() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.assign(None, "???", "64ab12"), "64ab12");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let mut a = SlugRegistry::new();
        let mut b = SlugRegistry::new();
        for (title, id) in [("A b", "1"), ("A b", "2"), ("C", "3")] {
            assert_eq!(a.assign(None, title, id), b.assign(None, title, id));
        }
    }
}
