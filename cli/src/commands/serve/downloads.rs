//! # Package Downloads
//!
//! File: cli/src/commands/serve/downloads.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `GET /download/{project_name}` builds a ZIP of the project's QFIL package
//! and streams it back as an attachment.
//!
//! ## Flow
//!
//! 1. Validate the name and resolve the package directory (400 / 404).
//! 2. Pick the download id: the `id` query parameter when it belongs to this
//!    project (`<name>_<digits>`) and no build under it is running, otherwise
//!    `<name>_<unix time>`.
//! 3. With `?progress=true`, answer `{"download_id": ...}` and stop. No
//!    temporary directory is created for this pre-flight request.
//! 4. Create a temporary directory, build the archive on the blocking pool
//!    while the progress record is updated, then stream the file with
//!    `tower_http::services::ServeFile`.
//! 5. Hand the directory and the record to the cleanup scheduler, on success
//!    and on failure alike.
//!
//! The browser script calls the pre-flight first, starts the download with
//! the returned id and polls `/progress/{id}` meanwhile.
//!
//! ## Limitations
//!
//! - Download ids are not secrets. A client that sends another client's id
//!   while that build is still running gets a fresh id instead, but a finished
//!   record can be replaced by a new build under the same id.
//! - Ids have one-second resolution, so two downloads of the same project
//!   started within the same second share an id (and a progress record).
//! - `HEAD` is answered with 405: it would otherwise build a whole archive
//!   just to report headers.
//!
use super::handlers::error_page;
use super::state::{AppState, SharedState};
use crate::common::archive::zip::build_archive;
use crate::common::progress::{ProgressRecord, ProgressStatus};
use crate::core::error::AppError;
use crate::projects::discovery;
use anyhow::anyhow;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{ALLOW, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

#[derive(Deserialize, Debug, Default)]
pub struct DownloadQuery {
    /// `"true"` for the pre-flight request.
    pub progress: Option<String>,
    /// Download id obtained from the pre-flight request.
    pub id: Option<String>,
}

impl DownloadQuery {
    fn is_preflight(&self) -> bool {
        self.progress.as_deref() == Some("true")
    }
}

/// File name offered to the browser for `project_name`.
pub fn archive_file_name(project_name: &str) -> String {
    format!("{project_name}_qfil_package.zip")
}

/// # Choose Download Id (`download_id_for`)
///
/// Reuses `requested` if it is an id of the form `<project_name>_<digits>`,
/// otherwise derives a fresh one from the current time.
///
/// ## Arguments
///
/// * `project_name`: The validated project name.
/// * `requested`: The `id` query parameter, if any.
///
/// ## Returns
///
/// * `String`: The id the build's progress is stored under.
pub fn download_id_for(project_name: &str, requested: Option<&str>) -> String {
    // Anything else (another project's id, path tricks) is ignored.
    let reusable = requested.filter(|id| {
        id.strip_prefix(project_name)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    });
    match reusable {
        Some(id) => id.to_string(),
        None => format!("{}_{}", project_name, chrono::Utc::now().timestamp()),
    }
}

/// `Content-Disposition` for an attachment named `file_name`. Non-ASCII names
/// get an ASCII fallback plus an RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> HeaderValue {
    // Plain ASCII names go out as-is.
    if file_name.is_ascii() {
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
            return value;
        }
    }
    // Older clients only read `filename`, so it gets an ASCII-only version.
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();
    let encoded: String = file_name
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"._-".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Whether a build under `id` is still writing its archive.
fn build_in_progress(state: &AppState, id: &str) -> bool {
    matches!(
        state.progress.get(id).status,
        ProgressStatus::Starting | ProgressStatus::Zipping
    )
}

/// # Download Handler (`download`)
///
/// Serves `GET /download/{project_name}`; see the module docs for the flow.
///
/// ## Arguments
///
/// * `state`: Shared application state (registry, progress store, cleanup).
/// * `project_name`: Path segment naming the registered project.
/// * `query`: `progress=true` for the pre-flight, `id` to reuse its download id.
/// * `request`: The original request, handed to `ServeFile` for range and
///   conditional handling.
///
/// ## Returns
///
/// * `Response`: `{"download_id"}` for the pre-flight, the ZIP attachment
///   otherwise, or the HTML error page (400 / 404 / 500).
pub async fn download(
    State(state): State<SharedState>,
    Path(project_name): Path<String>,
    Query(query): Query<DownloadQuery>,
    request: Request,
) -> Response {
    // `get` routes also match HEAD; building an archive just for headers is wasteful.
    if request.method() == Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(ALLOW, HeaderValue::from_static("GET"))],
        )
            .into_response();
    }

    // Validate the name and find the package before anything touches the disk.
    let package_dir =
        match discovery::resolve_package(&state.registry, &state.config, &project_name) {
            Ok((_, dir)) => dir,
            Err(e) => return error_page(&state, e),
        };
    // A running build keeps its id; a second request for it gets a new one.
    let requested = query
        .id
        .as_deref()
        .filter(|id| !build_in_progress(&state, id));
    let download_id = download_id_for(&project_name, requested);

    if query.is_preflight() {
        return Json(json!({ "download_id": download_id })).into_response();
    }

    // One temporary directory per build, removed by the cleanup scheduler.
    let temp_dir = match tempfile::Builder::new()
        .prefix(&state.config.temp_dir_prefix)
        .tempdir()
    {
        Ok(dir) => dir,
        Err(e) => {
            return error_page(
                &state,
                anyhow!(AppError::Archive(format!(
                    "cannot create temporary directory: {e}"
                ))),
            )
        }
    };
    let file_name = archive_file_name(&project_name);
    let zip_path = temp_dir.path().join(&file_name);

    info!("Download {} started for project '{}'", download_id, project_name);
    // The build is synchronous file I/O: keep it off the async workers.
    let built = {
        let tracker = Arc::clone(&state.progress);
        let zip_path = zip_path.clone();
        let id = download_id.clone();
        tokio::task::spawn_blocking(move || {
            build_archive(&package_dir, &zip_path, tracker.as_ref(), &id)
        })
        .await
    };

    let failure = match built {
        Ok(Ok(_summary)) => None,
        Ok(Err(e)) => Some(e),
        Err(join_err) => {
            // The builder never got to record its own failure.
            let message = format!("archive task failed: {join_err}");
            state
                .progress
                .set(&download_id, ProgressRecord::failed(message.clone()));
            Some(anyhow!(AppError::Archive(message)))
        }
    };
    if let Some(err) = failure {
        // The error record stays visible to pollers until the scheduled cleanup.
        if let Err(e) = std::fs::remove_file(&zip_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial archive {}: {}", zip_path.display(), e);
            }
        }
        state.cleanup.schedule(&download_id, temp_dir);
        return error_page(&state, err);
    }

    // The archive is open once `oneshot` resolves.
    let served = ServeFile::new(&zip_path).oneshot(request).await;
    state.cleanup.schedule(&download_id, temp_dir);

    // `ServeFile` cannot fail: its error type is `Infallible`.
    let mut response = match served {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    // Range / not-modified answers keep the headers `ServeFile` chose.
    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/zip"));
        headers.insert(CONTENT_DISPOSITION, content_disposition(&file_name));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_id_reuses_matching_ids() {
        assert_eq!(download_id_for("demo", Some("demo_1700000000")), "demo_1700000000");
    }

    #[test]
    fn test_download_id_rejects_foreign_ids() {
        for requested in ["other_1700000000", "demo_", "demo_12a", "demo1700000000", "demo_1/../x"] {
            let id = download_id_for("demo", Some(requested));
            assert_ne!(id, requested);
            assert!(id.starts_with("demo_"), "{id}");
        }
        let fresh = download_id_for("demo", None);
        let suffix = fresh.strip_prefix("demo_").unwrap();
        assert!(suffix.parse::<i64>().unwrap() > 1_600_000_000);
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition(&archive_file_name("demo")),
            "attachment; filename=\"demo_qfil_package.zip\""
        );
        let value = content_disposition(&archive_file_name("ünï"));
        let text = value.to_str().unwrap();
        assert!(text.contains("filename=\"_n__qfil_package.zip\""));
        assert!(text.contains("filename*=UTF-8''%C3%BCn%C3%AF_qfil_package.zip"));
    }
}
