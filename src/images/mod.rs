//! Image localization
//!
//! Finds the remote images a post references, downloads each unique URL
//! once, stores it under the post's directory in the images area and
//! reports where the rendered document should point.
//!
//! # Layout
//!
//! ```text
//! <output>/
//! └── images/
//!     └── posts/
//!         └── <slug>/
//!             ├── cover.jpg
//!             ├── image-1.png
//!             └── image-2.gif
//! ```
//!
//! Documents live one level below the output root, so they reference
//! images as `../images/posts/<slug>/<file>`.
//!
//! # Flow
//!
//! ```text
//! PostRecord ──► extract_image_references ──► ImageLocalizer::localize
//!                                                   │
//!                        ┌──────────────────────────┼─────────────────┐
//!                        ▼                          ▼                 ▼
//!                  ImageFetcher              detect_format        Storage
//!                  (bounded by semaphore)    (header, then URL)   (write)
//!                        │
//!                  any failure ──► ImageTarget::Remote(url)
//! ```

mod fetcher;
mod format;
mod localizer;
mod references;

pub use fetcher::{FetchConfig, FetchError, FetchedImage, HttpImageFetcher, ImageFetcher};
pub use format::{detect_format, ImageFormat};
pub use localizer::{ImageCounts, ImageLocalizer, LocalizerConfig};
pub use references::{
    extract_image_references, find_inline_image_urls, is_remote_url, rewrite_image_urls,
};
