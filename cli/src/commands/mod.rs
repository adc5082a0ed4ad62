//! # QFIL Downloader Command Modules
//!
//! File: cli/src/commands/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Top-level command groups of the CLI. Each module exposes a clap `*Args`
//! struct and an async `handle_*` function that `main` dispatches to.
//!
/// Web server: download pages, registry management UI and JSON API.
pub mod serve;
/// Registry maintenance from the command line: `list`, `add`, `remove`.
pub mod projects;
