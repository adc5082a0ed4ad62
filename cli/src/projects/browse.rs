//! # Folder Browsing
//!
//! File: cli/src/projects/browse.rs
//! Author: Christi Mahu
//!
//! Backs the folder picker on the management page: lists the subdirectories
//! of an absolute path and flags the ones that already contain the QFIL
//! package structure, so the user can pick a project root without typing it.
//!
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One subdirectory in a listing.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
    /// Whether `<path>/<package_subdir>` is a directory.
    pub has_structure: bool,
}

/// Result of browsing one directory.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FolderListing {
    pub current_path: String,
    pub parent_path: Option<String>,
    pub folders: Vec<FolderEntry>,
}

/// Directory browsing starts here when no path is given.
pub fn default_browse_root() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

/// # Browse Folders (`browse_folders`)
///
/// Lists the non-hidden subdirectories of `path` (or the home directory),
/// sorted case-insensitively by name.
///
/// ## Arguments
///
/// * `path`: Absolute directory to list. `None` or blank means the home directory.
/// * `config`: Supplies the package subdirectory used for `has_structure`.
///
/// ## Errors
///
/// - `AppError::RelativePath` if `path` is not absolute
/// - `AppError::PathNotFound` if it does not exist
/// - `AppError::NotADirectory` if it is a file
/// - `AppError::PermissionDenied` if it cannot be read
pub fn browse_folders(path: Option<&str>, config: &Config) -> Result<FolderListing> {
    let current = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => default_browse_root(),
    };
    if !current.is_absolute() {
        return Err(AppError::RelativePath {
            path: current.display().to_string(),
        }
        .into());
    }
    let metadata = fs::metadata(&current).map_err(|e| io_error(&current, e))?;
    if !metadata.is_dir() {
        return Err(AppError::NotADirectory {
            path: current.display().to_string(),
        }
        .into());
    }

    let entries = fs::read_dir(&current).map_err(|e| io_error(&current, e))?;
    let mut folders: Vec<FolderEntry> = entries
        .filter_map(|e| e.ok()) // Unreadable entries are skipped.
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter(|e| e.path().is_dir())
        .map(|e| {
            let path = e.path();
            FolderEntry {
                name: e.file_name().to_string_lossy().into_owned(),
                has_structure: config.package_dir(&path).is_dir(),
                path: path.display().to_string(),
            }
        })
        .collect();
    folders.sort_by_key(|f| f.name.to_lowercase());

    Ok(FolderListing {
        current_path: current.display().to_string(),
        // `None` at the filesystem root.
        parent_path: current.parent().map(|p| p.display().to_string()),
        folders,
    })
}

/// Maps an I/O failure on `path` onto the error taxonomy (404 / 403 / 500).
fn io_error(path: &Path, err: std::io::Error) -> anyhow::Error {
    let shown = path.display().to_string();
    match err.kind() {
        ErrorKind::NotFound => AppError::PathNotFound { path: shown }.into(),
        ErrorKind::PermissionDenied => AppError::PermissionDenied { path: shown }.into(),
        _ => anyhow::Error::new(err).context(format!("Failed to read directory {shown}")),
    }
}
