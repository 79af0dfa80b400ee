//! Locating image references in a post

use crate::types::{ImageReference, ImageRole, PostRecord};
use regex::{Captures, Regex};
use std::sync::OnceLock;

static RE_MARKDOWN_IMAGE: OnceLock<Regex> = OnceLock::new();
static RE_HTML_IMAGE: OnceLock<Regex> = OnceLock::new();

/// `![alt](url)`, `![alt](<url>)` and `![alt](url "title")` or trailing
/// attributes such as `align="center"`
fn re_markdown_image() -> &'static Regex {
    RE_MARKDOWN_IMAGE.get_or_init(|| {
        Regex::new(r#"!\[[^\]]*\]\(\s*<?(https?://[^\s)>]+)>?(?:\s+[^)]*)?\)"#)
            .unwrap_or_else(|e| panic!("invalid markdown image pattern: {e}"))
    })
}

/// `<img ... src="url" ...>`
fn re_html_image() -> &'static Regex {
    RE_HTML_IMAGE.get_or_init(|| {
        Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["'](https?://[^"']+)["']"#)
            .unwrap_or_else(|e| panic!("invalid html image pattern: {e}"))
    })
}

/// Whether a URL can be downloaded at all
pub fn is_remote_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Remote image URLs referenced in a body, in order of appearance.
///
/// Repeated references are kept; deduplication happens at localization.
pub fn find_inline_image_urls(body: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = re_markdown_image()
        .captures_iter(body)
        .chain(re_html_image().captures_iter(body))
        .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str().to_string())))
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, url)| url).collect()
}

/// All image references of a post: the cover first, then inline images
pub fn extract_image_references(record: &PostRecord) -> Vec<ImageReference> {
    let mut references = Vec::new();

    if let Some(cover) = record.cover_image.as_deref().map(str::trim) {
        if is_remote_url(cover) {
            references.push(ImageReference::new(cover, ImageRole::Cover, &record.slug));
        }
    }

    references.extend(
        find_inline_image_urls(&record.body)
            .into_iter()
            .map(|url| ImageReference::new(url, ImageRole::Inline, &record.slug)),
    );

    references
}

/// Replace image URLs in a body through `target`.
///
/// Only the URL part of image references is touched; every other byte of
/// the body is preserved.
pub fn rewrite_image_urls<'a, F>(body: &str, target: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let pass = re_markdown_image().replace_all(body, |caps: &Captures<'_>| replace_url(caps, &target));
    re_html_image()
        .replace_all(&pass, |caps: &Captures<'_>| replace_url(caps, &target))
        .into_owned()
}

fn replace_url<'a, F>(caps: &Captures<'_>, target: &F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let whole = &caps[0];
    let (Some(all), Some(url)) = (caps.get(0), caps.get(1)) else {
        return whole.to_string();
    };
    match target(url.as_str()) {
        Some(new_url) if new_url != url.as_str() => {
            let offset = url.start() - all.start();
            format!(
                "{}{}{}",
                &whole[..offset],
                new_url,
                &whole[offset + url.len()..]
            )
        }
        _ => whole.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_finds_markdown_and_html_in_order() {
        let body = r#"Intro
<img src="https://a.io/first.png" alt="x">
![one](https://cdn.hashnode.com/two.png align="center")
![local](./relative.png)
![title](https://a.io/three.gif "A title")
![dup](https://cdn.hashnode.com/two.png)"#;

        assert_eq!(
            find_inline_image_urls(body),
            vec![
                "https://a.io/first.png",
                "https://cdn.hashnode.com/two.png",
                "https://a.io/three.gif",
                "https://cdn.hashnode.com/two.png",
            ]
        );
    }

    #[test]
    fn test_plain_links_ignored() {
        let body = "[not an image](https://a.io/x.png) and https://a.io/y.png";
        assert!(find_inline_image_urls(body).is_empty());
    }

    #[test]
    fn test_cover_comes_first() {
        let record = PostRecord::new("1", "T", "my-post")
            .with_cover_image("https://a.io/cover.jpg")
            .with_body("![x](https://a.io/in.png)");

        let refs = extract_image_references(&record);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].role, ImageRole::Cover);
        assert_eq!(refs[0].post_slug, "my-post");
        assert_eq!(refs[1].url, "https://a.io/in.png");
        assert_eq!(refs[1].role, ImageRole::Inline);
    }

    #[test]
    fn test_non_http_cover_ignored() {
        let record = PostRecord::new("1", "T", "p").with_cover_image("data:image/png;base64,AAAA");
        assert!(extract_image_references(&record).is_empty());
    }

    #[test]
    fn test_rewrite_touches_only_urls() {
        let body = "Text https://a.io/x.png stays.\n![x](https://a.io/x.png align=\"center\")\n<IMG SRC='https://a.io/y.png'>\n![z](https://a.io/z.png)";
        let mut map = HashMap::new();
        map.insert("https://a.io/x.png", "../images/posts/p/image-1.png");
        map.insert("https://a.io/y.png", "../images/posts/p/image-2.png");

        let out = rewrite_image_urls(body, |url| map.get(url).copied());
        assert_eq!(
            out,
            "Text https://a.io/x.png stays.\n![x](../images/posts/p/image-1.png align=\"center\")\n<IMG SRC='../images/posts/p/image-2.png'>\n![z](https://a.io/z.png)"
        );
    }
}
