//! # QFIL Downloader HTTP Server
//!
//! File: cli/src/commands/serve/server_logic.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Builds the Axum router and runs it until Ctrl+C / SIGTERM:
//! 1. Build the shared `AppState` (registry, progress store, cleanup
//!    scheduler, templates)
//! 2. Set up the router with tracing and CORS middleware
//! 3. Bind the listener and print the startup banner
//! 4. Serve with graceful shutdown, then flush pending download cleanups
//!
//! ## Examples
//!
//! ```rust
//! let config = config::load_and_merge_config(args)?;
//! server_logic::run_server(config).await?;
//! ```
//!
use super::config::ServerConfig;
use super::state::{AppState, SharedState};
use super::{downloads, handlers, utils};
use crate::core::error::Result;
use anyhow::Context;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

/// # Run HTTP Server (`run_server`)
///
/// Starts the web application described by `config` and blocks until a
/// shutdown signal arrives.
///
/// ## Process:
/// 1. Builds the shared `AppState` (compiles the templates).
/// 2. Creates the router with `create_app`.
/// 3. Binds a `TcpListener` to the configured address. There is no fallback
///    port: a busy port is an error.
/// 4. Prints the startup banner and serves until Ctrl+C / SIGTERM.
/// 5. Runs every pending download cleanup before returning.
///
/// ## Arguments
///
/// * `config`: The merged `ServerConfig` (address, CORS, debug, app settings).
///
/// ## Returns
///
/// * `Result<()>`: `Ok(())` after a graceful shutdown.
///
/// ## Errors
///
/// This function can return errors if:
/// - Template compilation fails
/// - The listener cannot be bound (port in use, permissions)
/// - The server itself fails
pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Shared state first: a broken template should fail before we bind.
    let state = AppState::new(config.app.clone(), config.debug)?;
    let app = create_app(state.clone(), config.enable_cors);
    let addr = config.socket_addr();

    // Bind the TCP listener to the configured socket address.
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener to address {}", addr))?;

    // Display server information to the user upon startup.
    utils::print_banner(&config, addr, state.registry.load().len());
    info!("Starting server on {}", addr);
    println!("Server starting! Press Ctrl+C to stop.");

    // Serve until a shutdown signal; in-flight requests are allowed to finish.
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    // Temporary directories are removed even if the server failed.
    let pending = state.cleanup.pending_count();
    if pending > 0 {
        info!("Removing {} pending download(s) before exit", pending);
    }
    state.cleanup.flush();
    served?; // Propagate any server errors.

    println!("\nServer shutdown complete.");
    Ok(())
}

/// # Handle Shutdown Signal (`shutdown_signal`)
///
/// Resolves on Ctrl+C or, on Unix, SIGTERM. Used with `with_graceful_shutdown`.
async fn shutdown_signal() {
    // Future that completes when Ctrl+C is pressed.
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                // SIGTERM can still stop the server.
                std::future::pending::<()>().await;
            }
        }
    };

    // Future that completes when SIGTERM is received (Unix-specific).
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
                // Keep the future pending indefinitely if the handler fails.
                std::future::pending::<()>().await;
            }
        }
    };

    // No SIGTERM outside Unix.
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // Wait for either Ctrl+C or SIGTERM to occur.
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// # Create Axum Application (`create_app`)
///
/// All routes of the web interface and API, with request tracing and
/// (optionally permissive) CORS. Unmatched paths render the 404 page.
///
/// ## Arguments
///
/// * `state`: Shared application state, cloned into every handler.
/// * `enable_cors`: Apply a permissive CORS layer when `true`.
///
/// ## Returns
///
/// * `Router`: The fully configured Axum `Router` ready to be served.
pub fn create_app(state: SharedState, enable_cors: bool) -> Router {
    // Configure the CORS middleware layer based on the config flag.
    let cors_layer = if enable_cors {
        info!("CORS middleware enabled (permissive).");
        CorsLayer::permissive()
    } else {
        info!("CORS middleware disabled.");
        CorsLayer::new() // Effectively a no-op layer.
    };

    // Request lines at DEBUG (progress polling is chatty), responses at INFO.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default().include_headers(false))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        // HTML pages.
        .route("/", get(handlers::index))
        .route("/manage", get(handlers::manage))
        .route("/project/{project_name}", get(handlers::project_page))
        // JSON API and the download itself.
        .route("/api/projects", get(handlers::api_projects))
        .route("/progress/{download_id}", get(handlers::progress))
        .route("/download/{project_name}", get(downloads::download))
        .route("/browse_folders", get(handlers::browse_folders))
        .route("/add_project", post(handlers::add_project))
        .route("/remove_project/{project_name}", delete(handlers::remove_project))
        // Everything else renders the 404 page.
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer) // Apply tracing first.
                .layer(cors_layer), // Then apply CORS.
        )
        .with_state(state)
}

// --- Unit Tests ---
