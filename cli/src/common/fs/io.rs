//! # Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Filesystem helpers shared by the project listing, the project details page
//! and the registry:
//! - **`directory_size`**: recursive byte count, best effort.
//! - **`count_visible_entries`**: number of non-hidden top-level entries.
//! - **`list_files`**: recursive listing of regular files with size and mtime.
//! - **`write_string_atomically`**: replace a file's content via a sibling
//!   temporary file and a rename, creating the parent directory if needed.
//! - **`human_readable_size`** / **`format_modification_time`**: display helpers.
//!
//! The best-effort helpers never fail: unreadable entries are skipped and
//! logged at `debug`, so a single bad file cannot break a page.
//!
use crate::core::error::{AppError, Result};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// One regular file inside a package directory.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Base name.
    pub name: String,
    /// Path relative to the listed directory, `/`-separated.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Modification time, `YYYY-MM-DD HH:MM:SS` (UTC).
    pub modified: String,
}

/// # Directory Size (`directory_size`)
///
/// Total size in bytes of all regular files below `path`, following the same
/// rules as the archive builder (directories and unreadable entries add nothing).
///
/// ## Arguments
///
/// * `path`: Directory to measure. A missing directory measures 0.
///
/// ## Returns
///
/// * `u64`: The summed file sizes.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                // Best effort: a single unreadable entry must not break a page.
                debug!("Skipping entry while sizing '{}': {}", path.display(), e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// # Count Visible Entries (`count_visible_entries`)
///
/// Number of entries (files and directories) directly inside `path` whose
/// names do not start with `.`. This is the "file count" shown for a project.
///
/// ## Returns
///
/// * `usize`: The count, or 0 if the directory cannot be read.
pub fn count_visible_entries(path: &Path) -> usize {
    match fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            // Hidden entries (`.git`, `.DS_Store`, ...) are not counted.
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .count(),
        Err(e) => {
            debug!("Could not read directory '{}': {}", path.display(), e);
            0
        }
    }
}

/// # List Files (`list_files`)
///
/// Every regular file below `root`, sorted by base name (then relative path).
/// Unreadable entries are skipped.
///
/// ## Arguments
///
/// * `root`: The package directory to list.
///
/// ## Returns
///
/// * `Vec<FileEntry>`: One entry per file, with a `/`-separated relative path.
pub fn list_files(root: &Path) -> Vec<FileEntry> {
    let mut files: Vec<FileEntry> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let metadata = e.metadata().ok()?;
            let relative = e.path().strip_prefix(root).ok()?;
            Some(FileEntry {
                name: e.file_name().to_string_lossy().into_owned(),
                // Always `/`, whatever the platform separator is.
                path: relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .map(format_modification_time)
                    .unwrap_or_else(|_| "Unknown".to_string()),
            })
        })
        .collect();
    // Same base name in two subdirectories: order by path to stay deterministic.
    files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    files
}

/// # Write String Atomically (`write_string_atomically`)
///
/// Replaces the content of `path` with `content`. The data is written to a
/// temporary file next to `path` and renamed over it, so readers never observe
/// a half-written file.
///
/// ## Arguments
///
/// * `path`: The file to create or replace.
/// * `content`: The new content.
///
/// ## Returns
///
/// * `Result<()>`: `Ok(())` once the new content is in place.
///
/// ## Errors
///
/// Returns an `Err` if the parent directory cannot be created, or writing or
/// renaming the temporary file fails.
pub fn write_string_atomically(path: &Path, content: &str) -> Result<()> {
    // A bare file name has an empty parent; use the current directory then.
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir_exists(parent)?;

    // The temporary file must live on the same filesystem for the rename to be atomic.
    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    debug!("Wrote content to file: {:?}", path);
    Ok(())
}

/// # Ensure Directory Exists (`ensure_dir_exists`)
///
/// Ensures that a directory exists at the specified path, creating parents as needed.
///
/// ## Arguments
///
/// * `path`: The directory that must exist.
///
/// ## Errors
///
/// Returns an `Err` if the path exists but is not a directory, or creation fails.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        // Create the directory and any missing parents.
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        // Something else is in the way.
        anyhow::bail!(AppError::NotADirectory {
            path: path.display().to_string()
        });
    }
    Ok(())
}

/// # Format File Size (`human_readable_size`)
///
/// Converts a byte count into a string using binary units (B, KB, MB, GB, TB, PB).
/// Bytes are shown without decimals, larger units with one decimal place.
///
/// ## Arguments
///
/// * `size`: The size in bytes.
///
/// ## Returns
///
/// * `String`: The formatted size (e.g., "123 B", "1.2 KB", "1.1 GB").
pub fn human_readable_size(size: u64) -> String {
    // Define the units for sizing.
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    // Step up one unit per factor of 1024, stopping at the largest unit.
    let mut scaled = size as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        // Plain bytes, no decimals.
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.1} {}", scaled, UNITS[unit])
    }
}

/// # Format Modification Time (`format_modification_time`)
///
/// Formats a `SystemTime` as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// ## Returns
///
/// * `String`: The formatted time, or "Unknown" for times before the Unix epoch.
pub fn format_modification_time(time: std::time::SystemTime) -> String {
    let Ok(duration) = time.duration_since(std::time::UNIX_EPOCH) else {
        return "Unknown".to_string();
    };
    match chrono::DateTime::<chrono::Utc>::from_timestamp(
        duration.as_secs() as i64,
        duration.subsec_nanos(),
    ) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, len: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(0), "0 B");
        assert_eq!(human_readable_size(123), "123 B");
        assert_eq!(human_readable_size(1234), "1.2 KB");
        assert_eq!(human_readable_size(12_345), "12.1 KB");
        assert_eq!(human_readable_size(1_234_567), "1.2 MB");
        assert_eq!(human_readable_size(1_234_567_890), "1.1 GB");
        assert_eq!(human_readable_size(1_234_567_890_000), "1.1 TB");
    }

    /// Unit boundaries: just below a power of 1024 stays in the smaller unit.
    #[test]
    fn test_human_readable_size_unit_boundaries() {
        assert_eq!(human_readable_size(1023), "1023 B");
        assert_eq!(human_readable_size(1024), "1.0 KB");
        let pb = 1024_u64.pow(5);
        assert_eq!(human_readable_size(pb - 1), "1024.0 TB");
        assert_eq!(human_readable_size(pb), "1.0 PB");
        // Nothing bigger than PB.
        assert_eq!(human_readable_size(pb * 2048), "2048.0 PB");
    }

    #[test]
    fn test_directory_size_is_recursive() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.bin", 100);
        write(dir.path(), "sub/b.bin", 245);
        write(dir.path(), "sub/deeper/c.bin", 12_000);
        assert_eq!(directory_size(dir.path()), 12_345);
    }

    #[test]
    fn test_directory_size_missing_dir_is_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(directory_size(&dir.path().join("nope")), 0);
    }

    #[test]
    fn test_count_visible_entries_skips_hidden() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.bin", 1);
        write(dir.path(), ".hidden", 1);
        fs::create_dir(dir.path().join("images")).unwrap();
        assert_eq!(count_visible_entries(dir.path()), 2);
        assert_eq!(count_visible_entries(&dir.path().join("nope")), 0);
    }

    #[test]
    fn test_list_files_relative_paths_sorted_by_name() {
        let dir = tempdir().unwrap();
        write(dir.path(), "zeta.img", 3);
        write(dir.path(), "images/alpha.img", 5);
        let files = list_files(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "alpha.img");
        assert_eq!(files[0].path, "images/alpha.img");
        assert_eq!(files[0].size, 5);
        assert_eq!(files[1].path, "zeta.img");
        assert_ne!(files[1].modified, "Unknown");
    }

    #[test]
    fn test_write_string_atomically_creates_and_replaces() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/projects.json");
        write_string_atomically(&path, "[]")?;
        assert_eq!(fs::read_to_string(&path)?, "[]");
        write_string_atomically(&path, "[1]")?;
        assert_eq!(fs::read_to_string(&path)?, "[1]");
        Ok(())
    }

    #[test]
    fn test_ensure_dir_exists_path_is_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a_file.txt");
        fs::write(&file_path, "hello").unwrap();
        let err = ensure_dir_exists(&file_path).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_format_modification_time() {
        let unix_time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1609459200);
        assert_eq!(format_modification_time(unix_time), "2021-01-01 00:00:00");
    }
}
