//! # Page and API Handlers
//!
//! File: cli/src/commands/serve/handlers.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Axum handlers for everything except the download itself:
//!
//! | Route | Handler | Response |
//! |---|---|---|
//! | `GET /` | `index` | HTML list of downloadable projects |
//! | `GET /manage` | `manage` | HTML registry management page |
//! | `GET /project/{name}` | `project_page` | HTML file listing |
//! | `GET /api/projects` | `api_projects` | JSON array of project summaries |
//! | `GET /progress/{id}` | `progress` | JSON progress record |
//! | `GET /browse_folders` | `browse_folders` | JSON folder listing |
//! | `POST /add_project` | `add_project` | `{"success": true, "project": ...}` |
//! | `DELETE /remove_project/{name}` | `remove_project` | `{"success": true}` |
//!
//! ## Errors
//!
//! JSON routes return `ApiError`, rendered as `{"error": "<message>"}` with the
//! status from `core::error::status_for`. HTML routes render `error.html`
//! through `error_page`.
//!
use super::state::{AppState, SharedState};
use crate::core::error::{status_for, AppError, Result};
use crate::core::templating;
use crate::projects::{self, browse, discovery, NewProject};
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

/// Error returned by JSON endpoints.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        // Client mistakes are routine; only server faults are logged as errors.
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        } else {
            debug!("Request rejected: {:#}", self.0);
        }
        (status, Json(json!({ "error": user_message(&self.0) }))).into_response()
    }
}

/// The `AppError` message if there is one in the chain, otherwise the outermost message.
fn user_message(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AppError>())
        .map(ToString::to_string)
        .unwrap_or_else(|| err.to_string())
}

#[derive(Serialize)]
struct ErrorPage<'a> {
    status: u16,
    error: &'a str,
    message: String,
    details: Option<String>,
}

fn heading(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "Page not found",
        StatusCode::BAD_REQUEST => "Bad request",
        StatusCode::FORBIDDEN => "Forbidden",
        _ => "Internal server error",
    }
}

/// Renders `error.html` for `err`, with the status derived from the error.
pub fn error_page(state: &AppState, err: anyhow::Error) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Page request failed: {:#}", err);
    } else {
        debug!("Page request rejected: {:#}", err);
    }
    render_error(
        state,
        status,
        user_message(&err),
        state.debug.then(|| format!("{:?}", err)),
    )
}

fn render_error(
    state: &AppState,
    status: StatusCode,
    message: String,
    details: Option<String>,
) -> Response {
    let page = ErrorPage {
        status: status.as_u16(),
        error: heading(status),
        message,
        details,
    };
    match templating::render(&state.templates, "error.html", &page) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            // Last resort: plain text, same status.
            error!("Could not render error page: {:#}", e);
            (status, format!("{}: {}", page.error, page.message)).into_response()
        }
    }
}

fn page<C: Serialize>(state: &AppState, template: &str, context: &C) -> Response {
    match templating::render(&state.templates, template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => error_page(state, e),
    }
}

/// Runs filesystem-heavy work off the async worker threads.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    // A panic in `work` surfaces as a 500, not a dropped connection.
    tokio::task::spawn_blocking(work)
        .await
        .context("Background task panicked or was cancelled")?
}

// --- HTML pages ---

pub async fn index(State(state): State<SharedState>) -> Response {
    let listing = {
        let state = state.clone();
        run_blocking(move || Ok(discovery::available_projects(&state.registry, &state.config))).await
    };
    match listing {
        Ok(projects) => page(
            &state,
            "index.html",
            &json!({
                "projects": projects,
                "package_subdir": state.config.package_subdir,
            }),
        ),
        Err(e) => error_page(&state, e),
    }
}

pub async fn manage(State(state): State<SharedState>) -> Response {
    // Every record, including ones whose package is currently missing.
    let projects = state.registry.load();
    page(
        &state,
        "manage.html",
        &json!({
            "projects": projects,
            "package_subdir": state.config.package_subdir,
            "browse_root": browse::default_browse_root().display().to_string(),
        }),
    )
}

pub async fn project_page(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Response {
    let details = {
        let state = state.clone();
        run_blocking(move || discovery::project_details(&state.registry, &state.config, &name))
            .await
    };
    match details {
        Ok(project) => page(&state, "project_details.html", &json!({ "project": project })),
        Err(e) => error_page(&state, e),
    }
}

/// Fallback for unmatched routes.
pub async fn not_found(State(state): State<SharedState>) -> Response {
    render_error(
        &state,
        StatusCode::NOT_FOUND,
        "The requested URL was not found on the server.".to_string(),
        None,
    )
}

// --- JSON API ---

pub async fn api_projects(
    State(state): State<SharedState>,
) -> std::result::Result<Json<Vec<discovery::ProjectSummary>>, ApiError> {
    let projects =
        run_blocking(move || Ok(discovery::available_projects(&state.registry, &state.config)))
            .await?;
    Ok(Json(projects))
}

pub async fn progress(
    State(state): State<SharedState>,
    Path(download_id): Path<String>,
) -> Json<crate::common::progress::ProgressRecord> {
    Json(state.progress.get(&download_id))
}

#[derive(Deserialize, Debug, Default)]
pub struct BrowseQuery {
    pub path: Option<String>,
}

pub async fn browse_folders(
    State(state): State<SharedState>,
    Query(query): Query<BrowseQuery>,
) -> std::result::Result<Json<browse::FolderListing>, ApiError> {
    let listing =
        run_blocking(move || browse::browse_folders(query.path.as_deref(), &state.config)).await?;
    Ok(Json(listing))
}

/// Body of `POST /add_project`.
#[derive(Deserialize, Debug, Default)]
pub struct AddProjectRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn add_project(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<AddProjectRequest>, JsonRejection>,
) -> Response {
    // Axum's own rejection would be plain text; the page expects `{"error"}`.
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected add_project body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid request body: {}", rejection.body_text()) })),
            )
                .into_response();
        }
    };
    let added = run_blocking(move || {
        projects::add_project(
            &state.registry,
            &state.config,
            NewProject {
                name: request.name,
                path: request.path,
                description: request.description,
            },
        )
    })
    .await;
    match added {
        Ok(project) => Json(json!({ "success": true, "project": project })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn remove_project(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    run_blocking(move || projects::remove_project(&state.registry, &name)).await?;
    Ok(Json(json!({ "success": true })))
}
