//! # Project Name Validation
//!
//! File: cli/src/projects/validation.rs
//! Author: Christi Mahu
//!
//! Project names end up as URL segments, archive file names and download ids,
//! so they are restricted to a conservative character set:
//! - 1 to 100 characters,
//! - alphanumerics plus `_`, `-` and `.`,
//! - never `..` anywhere and never a leading `.`.
//!
use crate::core::error::AppError;

/// Longest accepted project name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Checks `name` against the project naming rules.
pub fn validate_project_name(name: &str) -> Result<(), AppError> {
    let reject = |reason: &str| Err(AppError::InvalidProjectName(format!("'{name}' {reason}")));

    // Characters, not bytes: non-ASCII letters count once.
    let len = name.chars().count();
    if len == 0 {
        return reject("is empty");
    }
    if len > MAX_NAME_LEN {
        return reject("is longer than 100 characters");
    }
    if name.contains("..") {
        return reject("contains '..'");
    }
    if name.starts_with('.') {
        return reject("starts with '.'");
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return reject(&format!("contains forbidden character '{bad}'"));
    }
    Ok(())
}
