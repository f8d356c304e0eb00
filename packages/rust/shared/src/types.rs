//! Core domain types for the Transync pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length (in chars) of the reason carried by an error outcome.
/// Longer reasons are truncated before they reach the database.
const MAX_ERROR_REASON_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One transcript discovered by a source, identified by its full path.
///
/// Content is not held here — it is read on demand through the source, so a
/// run never keeps more than one transcript body in memory at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable unique identity (full path within the source).
    pub path: String,
    /// Display name (file name).
    pub name: String,
    /// Grouping label (parent directory — the meeting series).
    pub group: String,
    /// Date parsed from the file name (`YYYY-MM-DD`), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_hint: Option<String>,
}

// ---------------------------------------------------------------------------
// MeetingRecord
// ---------------------------------------------------------------------------

/// Structured data extracted from one transcript by the summarization
/// service. Every field is optional; the service only fills in what it can
/// support from the text, and unknown fields in a response are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_title: Option<String>,
    /// Meeting date as `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_client: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub main_topics: Vec<String>,
    /// Important background information mentioned in the meeting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_context: Vec<String>,
    /// Things that might need follow-up, even if not explicit action items.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implied_work: Vec<String>,
}

impl MeetingRecord {
    /// True when the service produced nothing usable.
    pub fn is_empty(&self) -> bool {
        self.meeting_title.is_none()
            && self.date.is_none()
            && self.project_client.is_none()
            && self.attendees.is_empty()
            && self.main_topics.is_empty()
            && self.key_context.is_empty()
            && self.implied_work.is_empty()
    }
}

// ---------------------------------------------------------------------------
// OutcomeStatus
// ---------------------------------------------------------------------------

/// Terminal status recorded for one item in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Record extracted and published.
    Success,
    /// Service returned nothing usable; not retried automatically.
    Empty,
    /// Some stage failed; carries a truncated reason.
    Error(String),
}

impl OutcomeStatus {
    /// Build an error outcome, truncating the reason to
    /// [`MAX_ERROR_REASON_CHARS`] on a char boundary.
    pub fn error(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self::Error(reason.chars().take(MAX_ERROR_REASON_CHARS).collect())
    }

    /// The string stored in the tracker's status column.
    pub fn as_db_value(&self) -> String {
        match self {
            Self::Success => "success".into(),
            Self::Empty => "empty".into(),
            Self::Error(reason) => format!("error: {reason}"),
        }
    }

    /// Parse a status column value back into an outcome.
    pub fn from_db_value(value: &str) -> Self {
        match value {
            "success" => Self::Success,
            "empty" => Self::Empty,
            other => Self::Error(
                other
                    .strip_prefix("error:")
                    .map(str::trim_start)
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db_value())
    }
}

// ---------------------------------------------------------------------------
// ItemOutcome
// ---------------------------------------------------------------------------

/// One terminal outcome to record in the tracker (upsert by `filepath`).
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub filepath: String,
    pub filename: String,
    /// Resolved meeting date, or `"unknown"` when undetermined.
    pub meeting_date: String,
    /// Resolved owner (client entity).
    pub owner: String,
    pub status: OutcomeStatus,
}

// ---------------------------------------------------------------------------
// SyncRunSummary
// ---------------------------------------------------------------------------

/// Aggregate result of one sync run. Ephemeral (a copy is persisted to the
/// `sync_runs` table by the tracker, but this value itself lives for the
/// duration of one run only).
#[derive(Debug, Clone)]
pub struct SyncRunSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Candidates considered this run (after the optional limit).
    pub total: usize,
    pub success: usize,
    pub empty: usize,
    pub failed: usize,
}

impl SyncRunSummary {
    pub fn duration_seconds(&self) -> f64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_record_parses_with_missing_fields() {
        let record: MeetingRecord = serde_json::from_str(r#"{"date": "2025-09-22"}"#).unwrap();
        assert_eq!(record.date.as_deref(), Some("2025-09-22"));
        assert!(record.main_topics.is_empty());
        assert!(!record.is_empty());
    }

    #[test]
    fn meeting_record_ignores_unknown_fields() {
        let record: MeetingRecord =
            serde_json::from_str(r#"{"date": "2025-01-01", "sentiment": "positive"}"#).unwrap();
        assert_eq!(record.date.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn empty_record_detection() {
        assert!(MeetingRecord::default().is_empty());

        let record = MeetingRecord {
            main_topics: vec!["Roadmap".into()],
            ..Default::default()
        };
        assert!(!record.is_empty());
    }

    #[test]
    fn status_db_roundtrip() {
        for status in [
            OutcomeStatus::Success,
            OutcomeStatus::Empty,
            OutcomeStatus::error("connection reset"),
        ] {
            let parsed = OutcomeStatus::from_db_value(&status.as_db_value());
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn error_reason_truncated_to_limit() {
        let status = OutcomeStatus::error("x".repeat(500));
        match &status {
            OutcomeStatus::Error(reason) => assert_eq!(reason.chars().count(), 100),
            _ => panic!("expected Error"),
        }
        assert!(status.as_db_value().starts_with("error: "));
    }

    #[test]
    fn error_truncation_respects_char_boundaries() {
        let status = OutcomeStatus::error("é".repeat(200));
        match status {
            OutcomeStatus::Error(reason) => assert_eq!(reason.chars().count(), 100),
            _ => panic!("expected Error"),
        }
    }

    #[test]
    fn run_summary_duration() {
        let started = Utc::now();
        let summary = SyncRunSummary {
            started_at: started,
            completed_at: started + chrono::Duration::milliseconds(2500),
            total: 3,
            success: 2,
            empty: 0,
            failed: 1,
        };
        assert!((summary.duration_seconds() - 2.5).abs() < f64::EPSILON);
    }
}
