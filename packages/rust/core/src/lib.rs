//! Slug assignment, content rewrite, sync reconciliation, and the
//! end-to-end pipeline tying them together.
//!
//! The two tight pieces live here: [`assign`] deterministically derives a
//! unique, stable slug for every distinct URL across a corpus, and
//! [`rewrite`] substitutes tracking URLs back into source documents
//! without corrupting unrelated content.

pub mod assign;
pub mod pipeline;
pub mod rewrite;
pub mod sync;

pub use assign::{LinkMap, assign_slugs};
pub use pipeline::{
    CorpusScan, PipelineConfig, ProgressReporter, SilentProgress, rewrite_corpus, scan_corpus,
    sync_corpus,
};
pub use rewrite::{
    LinkChange, TransformResult, apply_transforms, transform_batch, transform_document,
};
pub use sync::{SyncPlan, SyncReport, partition, sync_links};
