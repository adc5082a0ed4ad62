//! # Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Entry point for filesystem helpers. Everything currently lives in `io`:
//! directory sizing and listing, atomic file replacement, and the size/time
//! formatting used by the pages and the CLI.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::io;
//!
//! let bytes = io::directory_size(&package_dir);
//! println!("{}", io::human_readable_size(bytes));
//! ```
//!

/// Directory sizing/listing, atomic writes and formatting helpers.
pub mod io;
