//! Small helpers shared by the pipeline and the command surface

use std::path::Path;

/// Shorten `s` to at most `max_len` bytes, ending in "..." when cut.
///
/// Never splits a multi-byte character.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let suffix = "...";
    let mut end = max_len.saturating_sub(suffix.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}

/// Render an output-relative path with forward slashes
pub fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Human-readable byte count
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate_str("Hello", 40), "Hello");
    }

    #[test]
    fn test_truncate_long_title() {
        let title = "Understanding async Rust from the ground up";
        let cut = truncate_str(title, 20);
        assert_eq!(cut, "Understanding asy...");
        assert_eq!(cut.len(), 20);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let cut = truncate_str("ééééé", 6);
        assert_eq!(cut, "é...");
    }

    #[test]
    fn test_display_relative() {
        let path: PathBuf = ["images", "posts", "hello", "cover.png"].iter().collect();
        assert_eq!(display_relative(&path), "images/posts/hello/cover.png");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MiB");
    }
}
