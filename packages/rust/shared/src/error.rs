//! Error types for Transync.
//!
//! Library crates use [`TransyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Transync operations.
#[derive(Debug, thiserror::Error)]
pub enum TransyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transcript source error (listing or reading items).
    #[error("source error: {0}")]
    Source(String),

    /// Tracker database error. Fatal to a run.
    #[error("tracker error: {0}")]
    Tracker(String),

    /// Summarization service error (API, transport, or protocol).
    #[error("summarize error: {0}")]
    Summarize(String),

    /// Memory store error (API, transport, or protocol).
    #[error("memory error: {0}")]
    Memory(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid input, held run lock, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TransyncError>;

impl TransyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a tracker storage fault (fatal to a run).
    pub fn is_tracker_fault(&self) -> bool {
        matches!(self, Self::Tracker(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TransyncError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = TransyncError::Tracker("disk full".into());
        assert!(err.to_string().contains("disk full"));
        assert!(err.is_tracker_fault());
    }

    #[test]
    fn non_tracker_errors_are_not_fatal() {
        let err = TransyncError::Summarize("rate limited".into());
        assert!(!err.is_tracker_fault());
    }
}
