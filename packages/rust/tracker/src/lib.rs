//! Durable processing ledger on libSQL.
//!
//! The tracker remembers which transcripts have been handled and with what
//! outcome, so each sync run only touches new work. It owns two tables:
//! `processed_items` (one row per transcript identity, upsert-only) and
//! `sync_runs` (one row per run). Rows are never deleted by normal
//! operation.
//!
//! The [`Tracker`] trait is what the orchestrator depends on; [`SqliteTracker`]
//! is the production implementation. Any storage fault maps to
//! [`TransyncError::Tracker`], which is fatal to a run.

mod migrations;

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use transync_shared::{ItemOutcome, OutcomeStatus, Result, SyncRunSummary, TransyncError};

// ---------------------------------------------------------------------------
// Tracker trait
// ---------------------------------------------------------------------------

/// Durable record of per-item outcomes and run history.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// True iff a record exists for this identity, regardless of status.
    async fn is_processed(&self, filepath: &str) -> Result<bool>;

    /// Upsert the terminal outcome for one item.
    async fn mark_processed(&self, outcome: &ItemOutcome) -> Result<()>;

    /// The subset of `candidates` with no settled record, in candidate order.
    ///
    /// Computed from a single bulk read of all recorded identities. When
    /// `retry_errors` is true, rows whose status is an error count as
    /// unsettled and are returned for another attempt; `success` and
    /// `empty` rows never are.
    async fn unprocessed_of(
        &self,
        candidates: &[String],
        retry_errors: bool,
    ) -> Result<Vec<String>>;

    /// Insert a run row in the `running` state. Returns the run id.
    async fn begin_run(&self) -> Result<String>;

    /// Complete a run row with its final counts and status.
    async fn finish_run(
        &self,
        run_id: &str,
        summary: &SyncRunSummary,
        status: &str,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One `processed_items` row.
#[derive(Debug, Clone)]
pub struct ProcessedRow {
    pub filepath: String,
    pub filename: String,
    pub meeting_date: String,
    pub owner: String,
    pub status: OutcomeStatus,
    pub processed_at: DateTime<Utc>,
}

/// One `sync_runs` row.
#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total: u64,
    pub success: u64,
    pub empty: u64,
    pub failed: u64,
    pub status: String,
}

// ---------------------------------------------------------------------------
// SqliteTracker
// ---------------------------------------------------------------------------

/// Tracker backed by a local libSQL database file.
pub struct SqliteTracker {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl SqliteTracker {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| TransyncError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        let tracker = Self { db, conn };
        tracker.run_migrations().await?;
        Ok(tracker)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    TransyncError::Tracker(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Get the record for one identity, if any.
    pub async fn get_processed(&self, filepath: &str) -> Result<Option<ProcessedRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT filepath, filename, meeting_date, owner, status, processed_at
                 FROM processed_items WHERE filepath = ?1",
                params![filepath],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_processed(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(TransyncError::Tracker(e.to_string())),
        }
    }

    /// List every recorded item, ordered by identity.
    pub async fn list_processed(&self) -> Result<Vec<ProcessedRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT filepath, filename, meeting_date, owner, status, processed_at
                 FROM processed_items ORDER BY filepath",
                params![],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_processed(&row)?);
        }
        Ok(results)
    }

    /// Most recent runs, newest first.
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<RunRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, completed_at, total, success, empty, failed, status
                 FROM sync_runs ORDER BY started_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(RunRow {
                id: get_text(&row, 0)?,
                started_at: parse_timestamp(&get_text(&row, 1)?)?,
                completed_at: match row.get::<String>(2) {
                    Ok(s) => Some(parse_timestamp(&s)?),
                    Err(_) => None,
                },
                total: row.get::<i64>(3).unwrap_or(0) as u64,
                success: row.get::<i64>(4).unwrap_or(0) as u64,
                empty: row.get::<i64>(5).unwrap_or(0) as u64,
                failed: row.get::<i64>(6).unwrap_or(0) as u64,
                status: get_text(&row, 7)?,
            });
        }
        Ok(results)
    }
}

#[async_trait]
impl Tracker for SqliteTracker {
    async fn is_processed(&self, filepath: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM processed_items WHERE filepath = ?1",
                params![filepath],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(TransyncError::Tracker(e.to_string())),
        }
    }

    async fn mark_processed(&self, outcome: &ItemOutcome) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO processed_items (filepath, filename, meeting_date, owner, status, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(filepath) DO UPDATE SET
                   filename = excluded.filename,
                   meeting_date = excluded.meeting_date,
                   owner = excluded.owner,
                   status = excluded.status,
                   processed_at = excluded.processed_at",
                params![
                    outcome.filepath.as_str(),
                    outcome.filename.as_str(),
                    outcome.meeting_date.as_str(),
                    outcome.owner.as_str(),
                    outcome.status.as_db_value(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;
        Ok(())
    }

    async fn unprocessed_of(
        &self,
        candidates: &[String],
        retry_errors: bool,
    ) -> Result<Vec<String>> {
        // Single bulk read keeps run startup cost bounded regardless of
        // candidate count.
        let mut rows = self
            .conn
            .query("SELECT filepath, status FROM processed_items", params![])
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;

        let mut settled: HashSet<String> = HashSet::new();
        while let Ok(Some(row)) = rows.next().await {
            let filepath = get_text(&row, 0)?;
            let status = OutcomeStatus::from_db_value(&get_text(&row, 1)?);
            if retry_errors && status.is_error() {
                continue;
            }
            settled.insert(filepath);
        }

        Ok(candidates
            .iter()
            .filter(|c| !settled.contains(*c))
            .cloned()
            .collect())
    }

    async fn begin_run(&self) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sync_runs (id, started_at, status) VALUES (?1, ?2, 'running')",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;
        Ok(id)
    }

    async fn finish_run(
        &self,
        run_id: &str,
        summary: &SyncRunSummary,
        status: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE sync_runs SET
                   completed_at = ?1, total = ?2, success = ?3, empty = ?4, failed = ?5, status = ?6
                 WHERE id = ?7",
                params![
                    summary.completed_at.to_rfc3339(),
                    summary.total as i64,
                    summary.success as i64,
                    summary.empty as i64,
                    summary.failed as i64,
                    status,
                    run_id,
                ],
            )
            .await
            .map_err(|e| TransyncError::Tracker(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn get_text(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| TransyncError::Tracker(e.to_string()))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TransyncError::Tracker(format!("invalid timestamp: {e}")))
}

fn row_to_processed(row: &libsql::Row) -> Result<ProcessedRow> {
    Ok(ProcessedRow {
        filepath: get_text(row, 0)?,
        filename: get_text(row, 1)?,
        meeting_date: get_text(row, 2)?,
        owner: get_text(row, 3)?,
        status: OutcomeStatus::from_db_value(&get_text(row, 4)?),
        processed_at: parse_timestamp(&get_text(row, 5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file tracker for testing.
    async fn test_tracker() -> SqliteTracker {
        let tmp = std::env::temp_dir().join(format!("transync_test_{}.db", Uuid::now_v7()));
        SqliteTracker::open(&tmp).await.expect("open test db")
    }

    fn outcome(filepath: &str, status: OutcomeStatus) -> ItemOutcome {
        ItemOutcome {
            filepath: filepath.into(),
            filename: filepath.rsplit('/').next().unwrap_or(filepath).into(),
            meeting_date: "2025-09-22".into(),
            owner: "Acme".into(),
            status,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let tracker = test_tracker().await;
        assert_eq!(tracker.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("transync_test_{}.db", Uuid::now_v7()));
        let t1 = SqliteTracker::open(&tmp).await.expect("first open");
        drop(t1);
        let t2 = SqliteTracker::open(&tmp).await.expect("second open");
        assert_eq!(t2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let tmp = std::env::temp_dir().join(format!("transync_test_{}.db", Uuid::now_v7()));
        let t1 = SqliteTracker::open(&tmp).await.unwrap();
        t1.mark_processed(&outcome("/t/a.txt", OutcomeStatus::Success))
            .await
            .unwrap();
        drop(t1);

        let t2 = SqliteTracker::open(&tmp).await.unwrap();
        assert!(t2.is_processed("/t/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn mark_and_is_processed() {
        let tracker = test_tracker().await;
        assert!(!tracker.is_processed("/t/a.txt").await.unwrap());

        tracker
            .mark_processed(&outcome("/t/a.txt", OutcomeStatus::Success))
            .await
            .unwrap();
        assert!(tracker.is_processed("/t/a.txt").await.unwrap());

        // Any status counts as processed, including errors.
        tracker
            .mark_processed(&outcome("/t/b.txt", OutcomeStatus::error("boom")))
            .await
            .unwrap();
        assert!(tracker.is_processed("/t/b.txt").await.unwrap());
    }

    #[tokio::test]
    async fn mark_processed_upserts_without_duplicating() {
        let tracker = test_tracker().await;

        tracker
            .mark_processed(&outcome("/t/a.txt", OutcomeStatus::error("timeout")))
            .await
            .unwrap();
        tracker
            .mark_processed(&outcome("/t/a.txt", OutcomeStatus::Success))
            .await
            .unwrap();

        let all = tracker.list_processed().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, OutcomeStatus::Success);
        assert_eq!(all[0].owner, "Acme");
    }

    #[tokio::test]
    async fn unprocessed_of_is_set_difference() {
        let tracker = test_tracker().await;
        tracker
            .mark_processed(&outcome("/t/a.txt", OutcomeStatus::Success))
            .await
            .unwrap();
        tracker
            .mark_processed(&outcome("/t/b.txt", OutcomeStatus::Empty))
            .await
            .unwrap();

        let candidates: Vec<String> =
            ["/t/a.txt", "/t/b.txt", "/t/c.txt", "/t/d.txt"]
                .map(String::from)
                .to_vec();
        let unprocessed = tracker.unprocessed_of(&candidates, true).await.unwrap();
        assert_eq!(unprocessed, vec!["/t/c.txt".to_string(), "/t/d.txt".to_string()]);
    }

    #[tokio::test]
    async fn unprocessed_of_empty_candidates() {
        let tracker = test_tracker().await;
        tracker
            .mark_processed(&outcome("/t/a.txt", OutcomeStatus::Success))
            .await
            .unwrap();

        let unprocessed = tracker.unprocessed_of(&[], true).await.unwrap();
        assert!(unprocessed.is_empty());
    }

    #[tokio::test]
    async fn error_rows_retry_when_enabled() {
        let tracker = test_tracker().await;
        tracker
            .mark_processed(&outcome("/t/a.txt", OutcomeStatus::error("api down")))
            .await
            .unwrap();
        tracker
            .mark_processed(&outcome("/t/b.txt", OutcomeStatus::Empty))
            .await
            .unwrap();

        let candidates: Vec<String> = ["/t/a.txt", "/t/b.txt"].map(String::from).to_vec();

        // retry_errors = true: the errored item comes back; the empty one stays settled
        let retried = tracker.unprocessed_of(&candidates, true).await.unwrap();
        assert_eq!(retried, vec!["/t/a.txt".to_string()]);

        // retry_errors = false: nothing comes back
        let settled = tracker.unprocessed_of(&candidates, false).await.unwrap();
        assert!(settled.is_empty());
    }

    #[tokio::test]
    async fn unprocessed_of_preserves_candidate_order() {
        let tracker = test_tracker().await;
        tracker
            .mark_processed(&outcome("/t/b.txt", OutcomeStatus::Success))
            .await
            .unwrap();

        let candidates: Vec<String> =
            ["/t/z.txt", "/t/b.txt", "/t/a.txt"].map(String::from).to_vec();
        let unprocessed = tracker.unprocessed_of(&candidates, true).await.unwrap();
        assert_eq!(unprocessed, vec!["/t/z.txt".to_string(), "/t/a.txt".to_string()]);
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let tracker = test_tracker().await;

        let run_id = tracker.begin_run().await.expect("begin run");
        assert!(!run_id.is_empty());

        let started = Utc::now();
        let summary = SyncRunSummary {
            started_at: started,
            completed_at: started + chrono::Duration::seconds(3),
            total: 5,
            success: 3,
            empty: 1,
            failed: 1,
        };
        tracker
            .finish_run(&run_id, &summary, "completed")
            .await
            .expect("finish run");

        let runs = tracker.recent_runs(10).await.expect("recent runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run_id);
        assert_eq!(runs[0].total, 5);
        assert_eq!(runs[0].success, 3);
        assert_eq!(runs[0].empty, 1);
        assert_eq!(runs[0].failed, 1);
        assert_eq!(runs[0].status, "completed");
        assert!(runs[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn recent_runs_newest_first() {
        let tracker = test_tracker().await;
        let first = tracker.begin_run().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = tracker.begin_run().await.unwrap();

        let runs = tracker.recent_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[1].id, first);

        let limited = tracker.recent_runs(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
