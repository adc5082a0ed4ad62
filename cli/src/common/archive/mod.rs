//! # Archive Utilities Module (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Archive creation for QFIL package downloads.
//!
//! - **`zip`**: builds a Deflate ZIP of a package directory while reporting
//!   per-file progress to a `ProgressTracker`.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive;
//!
//! let summary = archive::zip::build_archive(&package_dir, &zip_path, &*tracker, &download_id)?;
//! ```
//!

pub mod zip;
