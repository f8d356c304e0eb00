//! End-to-end sync pipeline: scan → filter → classify → summarize →
//! publish → record.
//!
//! Each item moves through a fixed progression and always ends in exactly
//! one tracker write: `success` after a publish, `empty` when extraction
//! yields nothing, or `error: <reason>` when any stage faults or times out.
//! Item faults never cross into run-level control flow — only tracker
//! faults abort a run.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use transync_memory::{MemoryStore, Publisher};
use transync_shared::{Item, ItemOutcome, OutcomeStatus, Result, SyncRunSummary, TransyncError};
use transync_source::ItemSource;
use transync_summarize::{Summarizer, Transformer};
use transync_tracker::Tracker;

use crate::classify::Classifier;

/// Meeting date recorded when no date could be determined.
const UNKNOWN_DATE: &str = "unknown";

// ---------------------------------------------------------------------------
// Options & progress
// ---------------------------------------------------------------------------

/// Run-level knobs for the sync pipeline.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum items to process this run; `None` means all of them.
    pub limit: Option<usize>,
    /// Whether items previously recorded as `error` are attempted again.
    pub retry_errors: bool,
    /// Upper bound on any single collaborator call.
    pub stage_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: None,
            retry_errors: true,
            stage_timeout: Duration::from_secs(120),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when an item starts processing.
    fn item_started(&self, name: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &SyncRunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &SyncRunSummary) {}
}

// ---------------------------------------------------------------------------
// Candidate discovery
// ---------------------------------------------------------------------------

/// List the current items that have no settled tracker record, in source
/// order. This is the whole of `--dry-run`, and the first phase of a run.
pub async fn unprocessed_items<I, T>(
    source: &I,
    tracker: &T,
    options: &SyncOptions,
) -> Result<Vec<Item>>
where
    I: ItemSource,
    T: Tracker,
{
    let items = tokio::time::timeout(options.stage_timeout, source.list_items())
        .await
        .map_err(|_| TransyncError::Source("timed out listing transcripts".into()))??;
    let identities: Vec<String> = items.iter().map(|i| i.path.clone()).collect();

    let unprocessed = tracker.unprocessed_of(&identities, options.retry_errors).await?;
    let keep: HashSet<&str> = unprocessed.iter().map(String::as_str).collect();

    Ok(items
        .into_iter()
        .filter(|item| keep.contains(item.path.as_str()))
        .collect())
}

// ---------------------------------------------------------------------------
// Run pipeline
// ---------------------------------------------------------------------------

/// Run the full sync pipeline.
///
/// 1. Scan the source and drop already-settled items (single bulk read)
/// 2. Truncate to the configured limit
/// 3. Process each remaining item, recording one outcome per item
/// 4. Persist and return the run summary
#[instrument(skip_all, fields(limit = ?options.limit))]
pub async fn run_sync<I, S, M, T>(
    options: &SyncOptions,
    source: &I,
    classifier: &Classifier,
    transformer: &Transformer<S>,
    publisher: &Publisher<M>,
    tracker: &T,
    progress: &dyn ProgressReporter,
) -> Result<SyncRunSummary>
where
    I: ItemSource,
    S: Summarizer,
    M: MemoryStore,
    T: Tracker,
{
    let started_at = Utc::now();

    progress.phase("Scanning transcripts");
    let mut pending = unprocessed_items(source, tracker, options).await?;

    info!(unprocessed = pending.len(), "found unprocessed transcripts");

    if let Some(limit) = options.limit {
        pending.truncate(limit);
    }

    let run_id = tracker.begin_run().await?;
    let total = pending.len();
    let mut success = 0usize;
    let mut empty = 0usize;
    let mut failed = 0usize;

    for (i, item) in pending.iter().enumerate() {
        progress.item_started(&item.name, i + 1, total);

        let outcome = process_item(
            item,
            source,
            classifier,
            transformer,
            publisher,
            options.stage_timeout,
        )
        .await;

        match &outcome.status {
            OutcomeStatus::Success => success += 1,
            OutcomeStatus::Empty => empty += 1,
            OutcomeStatus::Error(_) => failed += 1,
        }

        // The one write that settles this item. A fault here is fatal.
        tracker.mark_processed(&outcome).await?;
    }

    let summary = SyncRunSummary {
        started_at,
        completed_at: Utc::now(),
        total,
        success,
        empty,
        failed,
    };

    tracker.finish_run(&run_id, &summary, "completed").await?;
    progress.done(&summary);

    info!(
        total = summary.total,
        success = summary.success,
        empty = summary.empty,
        failed = summary.failed,
        duration_s = summary.duration_seconds(),
        "sync complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Per-item processing
// ---------------------------------------------------------------------------

/// Run one transcript through classify → read → summarize → publish and
/// return its terminal outcome.
///
/// Classification is total and cannot fail. Every later stage is bounded by
/// `stage_timeout`; a fault or timeout becomes an `error` outcome for this
/// item alone, and an empty extraction short-circuits to `empty` without
/// touching the memory store.
async fn process_item<I, S, M>(
    item: &Item,
    source: &I,
    classifier: &Classifier,
    transformer: &Transformer<S>,
    publisher: &Publisher<M>,
    stage_timeout: Duration,
) -> ItemOutcome
where
    I: ItemSource,
    S: Summarizer,
    M: MemoryStore,
{
    info!(path = %item.path, "processing transcript");

    let owner = classifier.resolve(&item.group, &item.name);

    let content = match stage(stage_timeout, source.read_item(item)).await {
        Ok(content) => content,
        Err(reason) => return terminal(item, &owner, UNKNOWN_DATE, OutcomeStatus::error(reason)),
    };

    let record = match stage(stage_timeout, transformer.transform(&content)).await {
        Ok(record) => record,
        Err(reason) => return terminal(item, &owner, UNKNOWN_DATE, OutcomeStatus::error(reason)),
    };

    if record.is_empty() {
        warn!(path = %item.path, "no data extracted");
        return terminal(item, &owner, UNKNOWN_DATE, OutcomeStatus::Empty);
    }

    // Date preference: what the service extracted, else the file name hint.
    let meeting_date = record
        .date
        .clone()
        .or_else(|| item.date_hint.clone())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    if let Err(reason) = stage(stage_timeout, publisher.publish(&owner, &record)).await {
        return terminal(item, &owner, UNKNOWN_DATE, OutcomeStatus::error(reason));
    }

    info!(path = %item.path, owner = %owner, date = %meeting_date, "transcript published");
    terminal(item, &owner, &meeting_date, OutcomeStatus::Success)
}

/// Await a stage with a timeout, flattening faults into a reason string.
async fn stage<V>(
    limit: Duration,
    fut: impl Future<Output = Result<V>>,
) -> std::result::Result<V, String> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("timeout".into()),
    }
}

fn terminal(item: &Item, owner: &str, meeting_date: &str, status: OutcomeStatus) -> ItemOutcome {
    ItemOutcome {
        filepath: item.path.clone(),
        filename: item.name.clone(),
        meeting_date: meeting_date.into(),
        owner: owner.into(),
        status,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
