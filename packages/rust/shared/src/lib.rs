//! Shared types, error model, and configuration for Transync.
//!
//! This crate is the foundation depended on by all other Transync crates.
//! It provides:
//! - [`TransyncError`] — the unified error type
//! - Domain types ([`Item`], [`MeetingRecord`], [`ItemOutcome`], [`SyncRunSummary`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, DefaultsConfig, MappingConfig, MemoryConfig, PatternRule,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{Result, TransyncError};
pub use types::{Item, ItemOutcome, MeetingRecord, OutcomeStatus, SyncRunSummary};
