//! # Delayed Download Cleanup
//!
//! File: cli/src/commands/serve/cleanup.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Every archive build leaves two things behind: a temporary directory holding
//! the ZIP file and a progress record. Both must outlive the response (the
//! file is still being streamed, pollers may still ask for the final state),
//! so they are handed to the `CleanupScheduler`, which removes them after the
//! configured delay.
//!
//! ## Behaviour
//!
//! - `schedule(id, dir)` spawns a tokio task that sleeps for the delay, then
//!   drops the progress record and deletes the directory.
//! - Pending cleanups are tracked per download id. Scheduling an id that is
//!   already pending aborts the old task and cleans its directory right away.
//! - `flush()` runs every pending cleanup immediately; the server calls it
//!   during graceful shutdown.
//! - Failures are logged and swallowed. Nothing is persisted, so a crash
//!   still leaves directories behind.
//!
use crate::common::progress::ProgressTracker;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

struct PendingCleanup {
    /// Distinguishes this entry from a later one scheduled under the same id.
    generation: u64,
    temp_dir: TempDir,
    task: AbortHandle,
}

#[derive(Default)]
struct Pending {
    next_generation: u64,
    entries: HashMap<String, PendingCleanup>,
}

/// Schedules removal of finished downloads. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CleanupScheduler {
    delay: Duration,
    tracker: Arc<dyn ProgressTracker>,
    pending: Arc<Mutex<Pending>>,
}

impl CleanupScheduler {
    pub fn new(delay: Duration, tracker: Arc<dyn ProgressTracker>) -> Self {
        Self {
            delay,
            tracker,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// # Schedule Cleanup (`schedule`)
    ///
    /// Removes the progress record for `id` and deletes `temp_dir` once the
    /// delay has passed. Must be called from within a tokio runtime.
    ///
    /// ## Arguments
    ///
    /// * `id`: The download id whose progress record is dropped.
    /// * `temp_dir`: The build's temporary directory; ownership moves here.
    ///
    /// ## Behaviour
    ///
    /// If `id` already has a pending cleanup, that task is aborted and its
    /// directory is removed immediately; the new entry replaces it.
    pub fn schedule(&self, id: &str, temp_dir: TempDir) {
        let this = self.clone();
        let key = id.to_string();

        // Hold the lock until the entry is in place, so the task cannot run first.
        let mut pending = self.lock();
        let generation = pending.next_generation;
        pending.next_generation += 1;

        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.run_due(&key, generation);
        })
        .abort_handle();

        let replaced = pending.entries.insert(
            id.to_string(),
            PendingCleanup {
                generation,
                temp_dir,
                task,
            },
        );
        drop(pending);

        // Filesystem work happens outside the lock.
        if let Some(old) = replaced {
            debug!("Replacing pending cleanup for '{}'", id);
            old.task.abort();
            remove_dir(id, old.temp_dir);
        }
        debug!("Scheduled cleanup of '{}' in {:?}", id, self.delay);
    }

    /// # Flush Pending Cleanups (`flush`)
    ///
    /// Runs every pending cleanup now, aborting the timers.
    ///
    /// ## Returns
    ///
    /// * `usize`: How many cleanups were run.
    pub fn flush(&self) -> usize {
        // Take everything out first; timers that fire later find nothing.
        let drained: Vec<(String, PendingCleanup)> = self.lock().entries.drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            entry.task.abort();
            self.tracker.remove(&id);
            remove_dir(&id, entry.temp_dir);
        }
        if count > 0 {
            debug!("Flushed {} pending download cleanup(s)", count);
        }
        count
    }

    /// Number of downloads waiting for cleanup.
    pub fn pending_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Timer callback: cleans `id` unless it was replaced or flushed meanwhile.
    fn run_due(&self, id: &str, generation: u64) {
        let entry = {
            let mut pending = self.lock();
            match pending.entries.get(id) {
                Some(entry) if entry.generation == generation => pending.entries.remove(id),
                _ => None,
            }
        };
        // Replaced or flushed in the meantime.
        let Some(entry) = entry else {
            return;
        };
        self.tracker.remove(id);
        remove_dir(id, entry.temp_dir);
    }

    /// A panic while holding the lock leaves the map usable; keep going.
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Deletes a download's directory, logging instead of failing.
fn remove_dir(id: &str, temp_dir: TempDir) {
    // `close` consumes the guard, so grab the path for the log line first.
    let path = temp_dir.path().to_path_buf();
    match temp_dir.close() {
        Ok(()) => debug!("Cleaned up download '{}' ({})", id, path.display()),
        Err(e) => warn!(
            "Failed to remove temporary directory {} for '{}': {}",
            path.display(),
            id,
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::progress::{ProgressRecord, ProgressStatus, ProgressStore};
    use std::path::PathBuf;

    fn temp_with_file() -> (TempDir, PathBuf) {
        let dir = tempfile::Builder::new()
            .prefix("qfil_download_")
            .tempdir()
            .unwrap();
        std::fs::write(dir.path().join("demo_qfil_package.zip"), b"PK").unwrap();
        let path = dir.path().to_path_buf();
        (dir, path)
    }

    #[tokio::test]
    async fn test_cleanup_runs_after_delay() {
        let store = Arc::new(ProgressStore::new());
        let scheduler = CleanupScheduler::new(Duration::from_millis(50), store.clone());
        store.set("demo_1", ProgressRecord::starting(1).completed());

        let (dir, path) = temp_with_file();
        scheduler.schedule("demo_1", dir);
        assert!(path.exists());
        assert_eq!(scheduler.pending_count(), 1);

        // Generous margin over the 50 ms delay for slow CI machines.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!path.exists());
        assert_eq!(store.get("demo_1").status, ProgressStatus::NotFound);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_cleans_immediately() {
        let store = Arc::new(ProgressStore::new());
        let scheduler = CleanupScheduler::new(Duration::from_secs(3600), store.clone());
        store.set("a_1", ProgressRecord::starting(0));
        let (dir_a, path_a) = temp_with_file();
        let (dir_b, path_b) = temp_with_file();
        scheduler.schedule("a_1", dir_a);
        scheduler.schedule("b_1", dir_b);

        assert_eq!(scheduler.flush(), 2);
        assert!(!path_a.exists());
        assert!(!path_b.exists());
        assert_eq!(store.get("a_1").status, ProgressStatus::NotFound);
        assert_eq!(scheduler.flush(), 0);
    }

    #[tokio::test]
    async fn test_rescheduling_replaces_pending_cleanup() {
        let store = Arc::new(ProgressStore::new());
        let scheduler = CleanupScheduler::new(Duration::from_secs(3600), store.clone());
        let (first, first_path) = temp_with_file();
        let (second, second_path) = temp_with_file();

        scheduler.schedule("demo_1", first);
        scheduler.schedule("demo_1", second);

        // The replaced directory goes at once; the new one waits for its timer.
        assert!(!first_path.exists());
        assert!(second_path.exists());
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.flush();
        assert!(!second_path.exists());
    }
}
