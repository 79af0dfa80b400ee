//! Body text rewriting

use crate::images::rewrite_image_urls;
use crate::types::{ImageMap, ImageTarget};

/// The post body with every localized image pointing at its local copy.
///
/// Remote targets and unmapped URLs are left as they are.
pub fn render_body(body: &str, images: &ImageMap) -> String {
    if images.values().all(|target| !target.is_local()) {
        return body.to_string();
    }
    rewrite_image_urls(body, |url| match images.get(url) {
        Some(ImageTarget::Local(path)) => Some(path.as_str()),
        _ => None,
    })
}
