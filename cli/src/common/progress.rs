//! # Download Progress Tracking (`common::progress`)
//!
//! File: cli/src/common/progress.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Archive builds report their progress here and the `/progress/{download_id}`
//! endpoint reads it back. A record exists for a download id from the moment
//! its build starts until the cleanup scheduler removes it.
//!
//! ## Architecture
//!
//! - `ProgressRecord` / `ProgressStatus`: the snapshot a poller sees.
//! - `ProgressTracker`: the seam handlers and the archive builder depend on,
//!   so tests can substitute a recording fake.
//! - `ProgressStore`: the production tracker. A single `Mutex` guards a flat
//!   `HashMap`; every operation holds it for O(1) work and never does I/O while
//!   holding it. Each `set` replaces a whole record, so readers always see a
//!   consistent snapshot.
//!
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Lifecycle state of one archive build.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Starting,
    Zipping,
    Complete,
    Error,
    /// Synthesized for unknown ids, never stored.
    NotFound,
}

/// Snapshot of one archive build, serialized as-is by the progress endpoint.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub progress: u8,
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressRecord {
    /// Record returned for ids that have no stored state.
    pub fn not_found() -> Self {
        Self {
            progress: 0,
            status: ProgressStatus::NotFound,
            total_files: None,
            current_file: None,
            current_filename: None,
            error: None,
        }
    }

    /// Files have been enumerated, nothing written yet.
    pub fn starting(total_files: usize) -> Self {
        Self {
            progress: 0,
            status: ProgressStatus::Starting,
            total_files: Some(total_files),
            current_file: Some(0),
            current_filename: None,
            error: None,
        }
    }

    /// `written` of `total_files` files are in the archive; `filename` was the last one.
    pub fn zipping(written: usize, total_files: usize, filename: impl Into<String>) -> Self {
        Self {
            progress: percent(written, total_files),
            status: ProgressStatus::Zipping,
            total_files: Some(total_files),
            current_file: Some(written),
            current_filename: Some(filename.into()),
            error: None,
        }
    }

    /// Terminal success state; keeps the counters of the last update.
    pub fn completed(self) -> Self {
        Self {
            progress: 100,
            status: ProgressStatus::Complete,
            ..self
        }
    }

    /// Terminal failure state.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            progress: 0,
            status: ProgressStatus::Error,
            total_files: None,
            current_file: None,
            current_filename: None,
            error: Some(message.into()),
        }
    }
}

/// `floor(written / total * 100)`, with an empty build counting as finished.
fn percent(written: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = written.min(total) as u128 * 100 / total as u128;
    pct as u8
}

/// Keyed store of progress records shared between archive builds and pollers.
pub trait ProgressTracker: Send + Sync {
    /// Replaces the whole record for `id`.
    fn set(&self, id: &str, record: ProgressRecord);

    /// Current record for `id`, or [`ProgressRecord::not_found`].
    fn get(&self, id: &str) -> ProgressRecord;

    /// Drops the record for `id` if present.
    fn remove(&self, id: &str);
}

/// In-memory [`ProgressTracker`] guarded by one mutex.
#[derive(Debug, Default)]
pub struct ProgressStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids currently tracked.
    #[allow(dead_code)] // Used by tests.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    // Records are replaced wholesale, so a panic in another holder cannot leave
    // a half-written entry behind; recovering from poisoning is safe.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProgressRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressTracker for ProgressStore {
    fn set(&self, id: &str, record: ProgressRecord) {
        self.lock().insert(id.to_string(), record);
    }

    fn get(&self, id: &str) -> ProgressRecord {
        self.lock()
            .get(id)
            .cloned()
            .unwrap_or_else(ProgressRecord::not_found)
    }

    fn remove(&self, id: &str) {
        self.lock().remove(id);
    }
}
