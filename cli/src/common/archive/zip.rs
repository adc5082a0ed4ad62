//! # QFIL Package Archive Builder (`common::archive::zip`)
//!
//! File: cli/src/common/archive/zip.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Writes the full recursive contents of a package directory into a ZIP file
//! and reports progress into a [`ProgressTracker`] after every file.
//!
//! ## Architecture
//!
//! The build is a blocking loop meant to run on tokio's blocking pool:
//! 1. Enumerate every regular file eagerly (the total is needed for percentages).
//! 2. Record `starting` with the file count.
//! 3. Deflate each file into the archive under its `/`-separated relative path,
//!    recording `zipping` after each one.
//! 4. Record `complete`, or `error` on the first failure.
//!
//! The build never retries and never skips a file. On failure the partially
//! written destination is left in place for the caller to discard.
//!
//! ## Usage
//!
//! ```rust
//! let store = ProgressStore::new();
//! let summary = zip::build_archive(&package_dir, &zip_path, &store, "demo_1700000000")?;
//! println!("{} files, {} bytes", summary.files_written, summary.archive_bytes);
//! ```
//!
use crate::common::progress::{ProgressRecord, ProgressTracker};
use crate::core::error::{AppError, Result};
use anyhow::{anyhow, Context};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, trace, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files at or above this size need ZIP64 extra fields.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Outcome of a successful build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files_written: usize,
    pub archive_bytes: u64,
}

/// A file selected for the archive.
#[derive(Debug, Clone)]
struct ArchiveEntry {
    source: PathBuf,
    /// Relative path inside the archive, always `/`-separated.
    name: String,
    /// Base name reported to pollers.
    file_name: String,
}

/// # Build Archive With Progress (`build_archive`)
///
/// Creates `destination` as a Deflate-compressed ZIP holding every regular file
/// below `source_dir`, and drives the record for `progress_id` through
/// `starting` → `zipping`… → `complete`, or to `error` on failure.
///
/// ## Arguments
///
/// * `source_dir`: The package directory to archive.
/// * `destination`: Path of the ZIP file to create. Its parent must exist.
/// * `tracker`: Receives the progress records.
/// * `progress_id`: Download id the records are stored under.
///
/// ## Returns
///
/// * `Result<ArchiveSummary>`: File count and archive size on success.
///
/// ## Errors
///
/// Returns `AppError::Archive` (with context) if enumeration, reading a source
/// file, or writing the archive fails. The tracker holds the same message.
pub fn build_archive(
    source_dir: &Path,
    destination: &Path,
    tracker: &dyn ProgressTracker,
    progress_id: &str,
) -> Result<ArchiveSummary> {
    info!(
        "Building archive '{}' from '{}' (download {})",
        destination.display(),
        source_dir.display(),
        progress_id
    );
    match write_archive(source_dir, destination, tracker, progress_id) {
        Ok(summary) => {
            info!(
                "Archive for download {} complete: {} files, {} bytes",
                progress_id, summary.files_written, summary.archive_bytes
            );
            Ok(summary)
        }
        Err(err) => {
            // Pollers and the caller see the same message, context chain included.
            let message = format!("{:#}", err);
            warn!("Archive for download {} failed: {}", progress_id, message);
            tracker.set(progress_id, ProgressRecord::failed(message.clone()));
            Err(anyhow!(AppError::Archive(message)))
        }
    }
}

fn write_archive(
    source_dir: &Path,
    destination: &Path,
    tracker: &dyn ProgressTracker,
    progress_id: &str,
) -> Result<ArchiveSummary> {
    // Enumerate first: percentages need the total up front.
    let entries = collect_entries(source_dir)?;
    let total = entries.len();

    let mut last = ProgressRecord::starting(total);
    tracker.set(progress_id, last.clone());

    let file = File::create(destination)
        .with_context(|| format!("Failed to create archive '{}'", destination.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (index, entry) in entries.iter().enumerate() {
        // A file removed since enumeration fails here and aborts the build.
        let source = File::open(&entry.source)
            .with_context(|| format!("Failed to open '{}'", entry.source.display()))?;
        let len = source
            .metadata()
            .with_context(|| format!("Failed to read metadata of '{}'", entry.source.display()))?
            .len();
        // ZIP64 headers are only written where a 32-bit size would overflow.
        zip.start_file(
            entry.name.as_str(),
            options.large_file(len >= ZIP64_THRESHOLD),
        )
        .with_context(|| format!("Failed to start archive entry '{}'", entry.name))?;
        std::io::copy(&mut BufReader::new(source), &mut zip)
            .with_context(|| format!("Failed to write '{}' into the archive", entry.name))?;

        let written = index + 1;
        last = ProgressRecord::zipping(written, total, entry.file_name.as_str());
        trace!(
            "Download {}: {}/{} ({}%) {}",
            progress_id,
            written,
            total,
            last.progress,
            entry.name
        );
        tracker.set(progress_id, last.clone());
    }

    // Central directory, then make sure everything reached the file.
    let mut writer = zip.finish().context("Failed to finalize archive")?;
    writer.flush().context("Failed to flush archive to disk")?;
    let archive_bytes = writer
        .get_ref()
        .metadata()
        .map(|m| m.len())
        .unwrap_or_default();

    tracker.set(progress_id, last.completed());
    Ok(ArchiveSummary {
        files_written: total,
        archive_bytes,
    })
}

/// Every regular file under `source_dir`, sorted by name at each directory level.
fn collect_entries(source_dir: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for entry_result in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry_result
            .with_context(|| format!("Failed to enumerate '{}'", source_dir.display()))?;
        // `is_file` follows symlinks: linked files are archived, directories,
        // dangling links and special files are not.
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .with_context(|| {
                format!(
                    "'{}' is not inside '{}'",
                    entry.path().display(),
                    source_dir.display()
                )
            })?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(ArchiveEntry {
            source: entry.path().to_path_buf(),
            name,
            file_name: entry.file_name().to_string_lossy().into_owned(),
        });
    }
    Ok(entries)
}
