//! Conversion pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Pipeline                               │
//! │           (ordering, per-post isolation, summary, dry run)          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            ExportPosts                              │
//! │                 lazy, validated, limited PostRecords                │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │ per post, several in flight
//!                  ┌─────────────────┴─────────────────┐
//!                  ▼                                   ▼
//!        ┌──────────────────┐                ┌──────────────────┐
//!        │ Tag and Series   │                │  ImageLocalizer  │
//!        │ resolvers (cache)│                │ (run-wide ledger)│
//!        └──────────────────┘                └──────────────────┘
//!                  └─────────────────┬─────────────────┘
//!                                    ▼
//!                         Renderer ──► Storage
//!                                 (in export order)
//! ```
//!
//! [`PipelineBuilder`] picks the storage (files or dry-run plan) and the
//! services for a run from the config and command-line overrides.
//!
//! A failure in one post is logged with the post identifier, counted, and
//! the run moves on. Only an unusable export stops a run, and that happens
//! before the pipeline starts.

mod builder;
mod coordinator;
mod progress;
mod storage;

pub use builder::{PipelineBuilder, PreparedRun, RunOverrides};
pub use coordinator::{Pipeline, PipelineOptions, PlannedDocument, PostError};
pub use progress::{RunProgress, RunSummary};
pub use storage::{DryRunStorage, FsStorage, PlannedWrite, Storage, StorageError};
