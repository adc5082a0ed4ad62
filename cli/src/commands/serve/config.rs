//! # Serve Command Configuration
//!
//! File: cli/src/commands/serve/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Combines the `serve` command-line arguments with the application
//! configuration loaded by `core::config` into a single `ServerConfig`.
//!
//! ## Precedence
//!
//! 1. Command-line flags
//! 2. Environment variables (`HOST`, `PORT`, `QFIL_DEBUG`,
//!    `QFIL_PROJECTS_FILE`, `QFIL_NO_CORS`), read by clap
//! 3. `.qfil-downloader.toml` / user `config.toml` (see `core::config`)
//! 4. Built-in defaults
//!
//! ## Examples
//!
//! ```bash
//! # Listen on all interfaces, port 5000 (defaults)
//! qfil-downloader serve
//!
//! # Local only, alternative registry, verbose error pages
//! qfil-downloader serve --host 127.0.0.1 --port 8080 \
//!     --projects-file /srv/qfil/projects.json --debug
//! ```
//!
use crate::core::config::{self, Config};
use crate::core::error::Result;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::debug;

/// # Serve Command Arguments (`ServeArgs`)
///
/// Arguments of `qfil-downloader serve`. Every option can also be given
/// through the environment variable named in its help text.
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    // --- Network ---
    /// Network address to bind to. `0.0.0.0` accepts connections from any interface.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, short, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // --- Behaviour ---
    /// Debug mode: `debug` log level by default and error details on error pages.
    #[arg(long, env = "QFIL_DEBUG")]
    pub debug: bool,

    /// JSON file holding the registered projects. Overrides the configuration files.
    #[arg(long, env = "QFIL_PROJECTS_FILE")]
    pub projects_file: Option<PathBuf>,

    /// Do not send CORS headers.
    #[arg(long, env = "QFIL_NO_CORS")]
    pub no_cors: bool,
}

/// # Effective Server Configuration (`ServerConfig`)
///
/// Everything `run_server` needs, after all sources have been merged.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Inverse of `--no-cors`.
    pub enable_cors: bool,
    pub debug: bool,
    /// Registry location, package layout and cleanup settings.
    pub app: Config,
}

impl ServerConfig {
    /// Address the listener binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// # Load and Merge Configuration (`load_and_merge_config`)
///
/// Loads the application configuration (defaults, user file, project file)
/// and applies `args` on top.
///
/// ## Arguments
///
/// * `args`: The parsed `serve` arguments (flags and environment).
///
/// ## Returns
///
/// * `Result<ServerConfig>`: The effective configuration for `run_server`.
///
/// ## Errors
///
/// Returns an `Err` if a configuration file exists but cannot be read,
/// parsed or validated.
pub fn load_and_merge_config(args: ServeArgs) -> Result<ServerConfig> {
    // Lower-precedence sources first.
    let app = config::load_config()?;
    Ok(merge_args(args, app))
}

/// Applies the `serve` arguments over the loaded application configuration.
fn merge_args(args: ServeArgs, mut app: Config) -> ServerConfig {
    // Only the registry path can come from both places; the flag wins.
    if let Some(projects_file) = args.projects_file {
        debug!(
            "Projects file overridden on the command line: {}",
            projects_file.display()
        );
        app.projects_file = projects_file.display().to_string();
    }
    // Host, port, CORS and debug exist only on the command line / environment.
    ServerConfig {
        host: args.host,
        port: args.port,
        enable_cors: !args.no_cors,
        debug: args.debug,
        app,
    }
}
