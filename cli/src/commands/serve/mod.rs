//! # QFIL Downloader Web Server (`serve`)
//!
//! File: cli/src/commands/serve/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Runs the web interface: a page listing every registered project whose
//! QFIL package is present, one-click ZIP downloads with a progress bar, a
//! management page for the project registry, and the JSON API behind them.
//!
//! ## Architecture
//!
//! - `config.rs`: `ServeArgs` and their merge with the application config
//! - `state.rs`: the shared `AppState` handed to every handler
//! - `handlers.rs`: HTML pages, JSON API and error rendering
//! - `downloads.rs`: the archive download endpoint
//! - `cleanup.rs`: delayed removal of finished downloads
//! - `server_logic.rs`: router, listener and graceful shutdown
//! - `utils.rs`: startup banner helpers
//!
//! ## Examples
//!
//! ```bash
//! # Defaults: 0.0.0.0:5000, ./projects.json
//! qfil-downloader serve
//!
//! # Same, configured through the environment
//! HOST=127.0.0.1 PORT=8080 QFIL_DEBUG=1 qfil-downloader serve
//! ```
//!
use crate::core::error::Result;
use tracing::info;

pub use config::ServeArgs;

pub mod cleanup;
pub mod config;
pub mod downloads;
pub mod handlers;
pub mod server_logic;
pub mod state;
pub mod utils;

/// # Handle Serve Command (`handle_serve`)
///
/// Loads and merges the configuration, then runs the server until it is
/// asked to shut down.
pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    info!("Handling serve command with args: {:?}", args);

    let config = config::load_and_merge_config(args)?;
    info!("Effective server config: {:?}", config);

    server_logic::run_server(config).await
}
