//! Supported image formats and their detection

use std::fmt;
use url::Url;

/// Image formats that can be stored locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Svg,
}

impl ImageFormat {
    /// File extension used for stored files
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Svg => "svg",
        }
    }

    /// Detect from a MIME type, ignoring parameters such as `charset`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::Webp),
            "image/svg+xml" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    /// Detect from the extension of the URL's last path segment
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let segment = parsed.path_segments()?.last()?;
        let (_, ext) = segment.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Content types that say nothing about the payload
fn is_generic_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
    matches!(
        essence.as_str(),
        "" | "application/octet-stream" | "binary/octet-stream"
    )
}

/// Pick the format of a downloaded image.
///
/// A specific `Content-Type` wins; a missing or generic one defers to the
/// URL extension. Returns a description of the problem when neither yields
/// a supported format.
pub fn detect_format(content_type: Option<&str>, url: &str) -> Result<ImageFormat, String> {
    match content_type {
        Some(mime) if !is_generic_mime(mime) => ImageFormat::from_mime(mime)
            .ok_or_else(|| format!("unsupported content type '{}'", mime.trim())),
        _ => ImageFormat::from_url(url)
            .ok_or_else(|| "could not determine image format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("IMAGE/JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(
            ImageFormat::from_mime("image/svg+xml; charset=utf-8"),
            Some(ImageFormat::Svg)
        );
        assert_eq!(ImageFormat::from_mime("image/bmp"), None);
        assert_eq!(ImageFormat::from_mime("text/html"), None);
    }

    #[test]
    fn test_from_url() {
        assert_eq!(
            ImageFormat::from_url("https://cdn.hashnode.com/res/a/photo.JPEG?w=800"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_url("https://x.io/a.webp#frag"), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::from_url("https://x.io/image"), None);
        assert_eq!(ImageFormat::from_url("not a url"), None);
    }

    #[test]
    fn test_jpeg_extension_normalized() {
        assert_eq!(ImageFormat::from_extension("jpeg").map(|f| f.extension()), Some("jpg"));
    }

    #[test]
    fn test_detect_prefers_header() {
        assert_eq!(
            detect_format(Some("image/gif"), "https://x.io/a.png"),
            Ok(ImageFormat::Gif)
        );
    }

    #[test]
    fn test_detect_generic_header_uses_url() {
        assert_eq!(
            detect_format(Some("application/octet-stream"), "https://x.io/a.png"),
            Ok(ImageFormat::Png)
        );
        assert_eq!(detect_format(None, "https://x.io/a.svg"), Ok(ImageFormat::Svg));
    }

    #[test]
    fn test_detect_rejects_non_images() {
        assert!(detect_format(Some("text/html"), "https://x.io/a.png").is_err());
        assert!(detect_format(None, "https://x.io/download").is_err());
    }
}
