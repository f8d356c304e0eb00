//! Advisory run lock.
//!
//! Two sync runs sharing one tracker database could each compute the same
//! unprocessed set and double-publish before either records an outcome. A
//! lock file beside the database, created with `create_new`, keeps runs
//! mutually exclusive on one machine. The file holds the owning PID to aid
//! debugging a stale lock after a crash.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use transync_shared::{Result, TransyncError};

/// Held for the duration of one run; releases the lock file on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock for the given tracker database path.
    ///
    /// Fails with a validation error when another run holds the lock. A
    /// stale file left behind by a crashed process must be removed by hand
    /// (the error message names it).
    pub fn acquire(db_path: &Path) -> Result<Self> {
        let path = lock_path(db_path);

        let result = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path);

        match result {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                debug!(path = %path.display(), "run lock acquired");
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(TransyncError::validation(format!(
                    "another sync run appears to be in progress (lock file {} exists); \
                     remove it if no other run is active",
                    path.display()
                )))
            }
            Err(e) => Err(TransyncError::io(&path, e)),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        }
    }
}

/// Lock file path for a database path: `<db>.lock`.
fn lock_path(db_path: &Path) -> PathBuf {
    let mut os_string = db_path.as_os_str().to_os_string();
    os_string.push(".lock");
    PathBuf::from(os_string)
}
