//! # QFIL Downloader Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types used throughout the application. It
//! follows a two-layer approach:
//! - `AppError`: A `thiserror` enum naming every domain failure the HTTP
//!   surface and the CLI need to tell apart (bad names, unknown projects,
//!   missing package directories, permission problems, build failures).
//! - `Result<T>`: An alias for `anyhow::Result<T>`, so lower layers can add
//!   context freely while handlers can still recover the `AppError` with
//!   `downcast_ref`.
//!
//! ## HTTP mapping
//!
//! `AppError::status_code` maps each variant onto the error taxonomy of the
//! web API:
//! - validation errors → `400 Bad Request`
//! - not-found errors → `404 Not Found`
//! - permission errors → `403 Forbidden`
//! - registry, archive, config and template failures → `500`
//!
//! Anything that is not an `AppError` is treated as an internal error.
//!
//! ## Examples
//!
//! ```rust
//! if !package_dir.is_dir() {
//!     return Err(AppError::PackageNotFound { name: name.to_string() }.into());
//! }
//!
//! let status = status_for(&err); // 404
//! ```
//!
use axum::http::StatusCode;
use thiserror::Error;

/// Domain errors for the QFIL Downloader.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid project name: {0}")]
    InvalidProjectName(String),

    #[error("Name and path are required")]
    MissingFields,

    #[error("Project not found: {name}")]
    ProjectNotFound { name: String },

    #[error("QFIL package not found for project: {name}")]
    PackageNotFound { name: String },

    #[error("QFIL directory not found at: {path}")]
    PackageDirMissing { path: String },

    #[error("Project name already exists: {name}")]
    DuplicateProject { name: String },

    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Path must be absolute: {path}")]
    RelativePath { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Project registry error: {0}")]
    Registry(String),

    #[error("Error creating download package: {0}")]
    Archive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template rendering error: {source}")]
    Template {
        #[from]
        source: tera::Error,
    },
}

impl AppError {
    /// HTTP status used when this error reaches a request handler.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidProjectName(_)
            | AppError::MissingFields
            | AppError::PackageDirMissing { .. }
            | AppError::DuplicateProject { .. }
            | AppError::NotADirectory { .. }
            | AppError::RelativePath { .. } => StatusCode::BAD_REQUEST,
            AppError::ProjectNotFound { .. }
            | AppError::PackageNotFound { .. }
            | AppError::PathNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AppError::Registry(_)
            | AppError::Archive(_)
            | AppError::Config(_)
            | AppError::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Resolves the HTTP status for any error in the application's `Result`.
/// Errors that do not carry an `AppError` anywhere in their chain are internal errors.
pub fn status_for(err: &anyhow::Error) -> StatusCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AppError>())
        .map(AppError::status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
