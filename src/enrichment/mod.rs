//! Tag and series enrichment
//!
//! Turns opaque tag identifiers into display names. The resolver owns a
//! run-scoped cache in front of a [`TagLookup`] service; when enrichment is
//! disabled, no credential is configured, or the service fails, tags get a
//! deterministic `Tag-<id>` name instead and the run carries on.
//!
//! ```text
//! post tag ids ──► TagResolver ──cache hit──► ResolvedTag
//!                      │
//!                 cache miss
//!                      ▼
//!              TagLookup (batched) ──error──► Fallback(Tag-<id>, reason)
//!                      │
//!                      ▼
//!               Resolved(name)
//! ```
//!
//! Series work the same way through [`SeriesResolver`], except that the
//! whole series list of a publication is fetched at once.

mod client;
mod resolver;
mod series;

pub use client::{
    ClientConfig, EnrichmentError, HashnodeClient, SeriesLookup, TagLookup, DEFAULT_ENDPOINT,
    SERIES_PAGE_SIZE,
};
pub use resolver::{TagCounts, TagResolver, DEFAULT_BATCH_SIZE};
pub use series::SeriesResolver;
