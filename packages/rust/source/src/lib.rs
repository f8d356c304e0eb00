//! Transcript sources.
//!
//! A source produces the current set of candidate transcripts and reads
//! their content on demand. The pipeline depends on the [`ItemSource`]
//! trait only, so tests (and future sources — an API poll, a download
//! folder watcher) can substitute their own implementation. The default is
//! [`FsSource`], a recursive scan for `*.txt` files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument};

use transync_shared::{Item, Result, TransyncError};

/// Pattern for a date embedded in a transcript file name,
/// e.g. `Asurion x Section 2025-09-22 12_31 transcript.txt`.
const DATE_PATTERN: &str = r"(\d{4}-\d{2}-\d{2})";

// ---------------------------------------------------------------------------
// ItemSource trait
// ---------------------------------------------------------------------------

/// A provider of candidate transcripts.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// List all current items, in stable source order.
    async fn list_items(&self) -> Result<Vec<Item>>;

    /// Read one item's raw text content.
    async fn read_item(&self, item: &Item) -> Result<String>;
}

// ---------------------------------------------------------------------------
// FsSource
// ---------------------------------------------------------------------------

/// Filesystem source: every `*.txt` file under a root directory, recursively.
///
/// The grouping label is the parent directory name (the meeting series);
/// the date hint is parsed from the file name. Listing order is the sorted
/// full path, so runs are deterministic.
pub struct FsSource {
    root: PathBuf,
    date_re: Regex,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            // The pattern is a compile-time constant; it always parses.
            date_re: Regex::new(DATE_PATTERN).expect("valid date pattern"),
        }
    }

    fn item_for(&self, path: &Path) -> Item {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let group = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let date_hint = self
            .date_re
            .find(&name)
            .map(|m| m.as_str().to_string());

        Item {
            path: path.to_string_lossy().into_owned(),
            name,
            group,
            date_hint,
        }
    }
}

#[async_trait]
impl ItemSource for FsSource {
    #[instrument(skip_all, fields(root = %self.root.display()))]
    async fn list_items(&self) -> Result<Vec<Item>> {
        if !self.root.exists() {
            debug!("transcripts directory does not exist, nothing to list");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        collect_txt_files(&self.root, &mut paths)?;
        paths.sort();

        let items: Vec<Item> = paths.iter().map(|p| self.item_for(p)).collect();
        debug!(count = items.len(), "listed transcript files");
        Ok(items)
    }

    async fn read_item(&self, item: &Item) -> Result<String> {
        std::fs::read_to_string(&item.path)
            .map_err(|e| TransyncError::Source(format!("{}: {e}", item.path)))
    }
}

/// Recursively collect `*.txt` files under `dir`.
fn collect_txt_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| TransyncError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| TransyncError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_txt_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "txt") {
            out.push(path);
        }
    }
    Ok(())
}
