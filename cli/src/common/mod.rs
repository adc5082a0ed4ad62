//! # Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared building blocks used by the command modules:
//!
//! - **`archive`**: ZIP creation with per-file progress reporting.
//! - **`fs`**: directory sizing, listing, atomic writes and display formatting.
//! - **`progress`**: the progress records of in-flight downloads and the
//!   `ProgressTracker` seam they are stored behind.
//!
//! Command handlers import the specific submodule they need:
//!
//! ```rust
//! use crate::common::{archive, fs::io, progress::ProgressStore};
//! ```
//!

/// ZIP archive creation.
pub mod archive;
/// Filesystem helpers.
pub mod fs;
/// Download progress records and store.
pub mod progress;
