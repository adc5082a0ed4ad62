//! # QFIL Downloader Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Entry point of the `qfil-downloader` binary. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the `serve` or `projects` command handlers
//!
//! ## Examples
//!
//! ```bash
//! # Start the web interface on 0.0.0.0:5000
//! qfil-downloader serve
//!
//! # Register a project, then list what can be downloaded
//! qfil-downloader projects add sm8550 /srv/aosp/sm8550 --description "SM8550 eMMC"
//! qfil-downloader -v projects list
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging from `-v`, `serve --debug` and `RUST_LOG`
//! 3. Route to the command handler
//! 4. Print any error and exit with status 1
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // `serve` and `projects` command handlers
mod common; // Archive builder, progress tracking, filesystem helpers
mod core; // Configuration, errors, templating
mod projects; // Project registry and discovery

#[derive(Parser, Debug)]
#[command(
    name = "qfil-downloader",
    about = "📦 QFIL Downloader: web downloads of QFIL flashing packages from AOSP build trees",
    long_about = "Serves a small web interface listing registered AOSP projects and lets users\n\
                  download each project's QFIL package as a ZIP archive, with live progress.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Run the web server.
    #[command(alias = "s")]
    Serve(commands::serve::ServeArgs),
    /// Manage the project registry.
    #[command(alias = "p")]
    Projects(commands::projects::ProjectsArgs),
}

/// Default log level for `-v` count, with `serve --debug` raising the floor to `debug`.
fn default_log_level(verbose: u8, debug: bool) -> &'static str {
    match (verbose, debug) {
        (0, false) => "warn",
        (1, false) => "info",
        (0 | 1, true) | (2, _) => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments using Clap.
    let cli = Cli::parse();

    // Determine log level: RUST_LOG wins, then -v count / `serve --debug`.
    let debug = matches!(&cli.command, Commands::Serve(args) if args.debug);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(cli.verbose, debug)));
    // Initialize the tracing subscriber (logs go to stderr).
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    // Route to the command handler.
    let command_result = match cli.command {
        Commands::Serve(args) => commands::serve::handle_serve(args).await,
        Commands::Projects(args) => commands::projects::handle_projects(args).await,
    };

    // Report errors consistently and exit non-zero.
    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
