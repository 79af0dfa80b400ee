//! Reading Hashnode blog exports
//!
//! An export is a JSON document holding either an object with a `posts`
//! array (plus optional `publication` metadata) or a bare array of posts.
//! The container is validated up front; individual entries are validated
//! lazily while iterating, so one bad entry never aborts the run.
//!
//! # Example Usage
//!
//! ```no_run
//! use h2o::export::ExportReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = ExportReader::open("hashnode-export.json")?;
//! let mut posts = reader.posts(Some(10));
//! for post in posts.by_ref() {
//!     println!("{} -> {}", post.id, post.slug);
//! }
//! println!("skipped {}", posts.stats().skipped_invalid);
//! # Ok(())
//! # }
//! ```
//!
//! # Flow
//!
//! ```text
//! export.json ──► ExportReader (container check)
//!                      │
//!                      ▼
//!                 ExportPosts ──► entry validation ──► SlugRegistry
//!                      │                                    │
//!                      ▼                                    ▼
//!                  ReadStats                           PostRecord
//! ```

mod reader;
mod slug;

pub use reader::{
    ExportError, ExportPosts, ExportReader, ExportSummary, PublicationInfo, ReadStats, SkipReason,
};
pub use slug::{is_path_safe, slugify, SlugRegistry};
