//! h2o: Hashnode export to Obsidian vault converter
//!
//! Turns a Hashnode blog export into a folder of markdown notes:
//! - Streaming, per-entry validation of the JSON export
//! - Tag identifiers resolved to names through the Hashnode GraphQL API,
//!   with deterministic fallback names when the service is unavailable
//! - Remote images downloaded next to the notes and links rewritten
//! - YAML front matter that round-trips through any YAML parser
//! - Drafts and published posts sorted into separate areas

pub mod config;
pub mod enrichment;
pub mod export;
pub mod images;
pub mod pipeline;
pub mod render;
pub mod types;
pub mod util;

pub use config::Config;
pub use types::*;
