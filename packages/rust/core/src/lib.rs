//! Core pipeline orchestration and domain logic for Transync.
//!
//! This crate ties together the transcript source, summarization,
//! publishing, and outcome tracking into the end-to-end sync run.

pub mod classify;
pub mod lock;
pub mod pipeline;

pub use classify::Classifier;
pub use lock::RunLock;
pub use pipeline::{
    ProgressReporter, SilentProgress, SyncOptions, run_sync, unprocessed_items,
};
