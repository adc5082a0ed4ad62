//! # QFIL Downloader Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Foundational pieces used by every command:
//! - `config`: configuration loading, merging and validation
//! - `error`: the `AppError` taxonomy, its HTTP status mapping and `Result`
//! - `templating`: the embedded Tera templates of the web interface
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{AppError, Result}; // For error handling
//! use crate::core::templating; // For rendering pages
//! ```
//!
pub mod config;
pub mod error;
pub mod templating;
