// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request handlers and router assembly for the primary and metrics
//! servers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use insights_config::AllowListManager;
use insights_core::{AppTag, LEGACY_PREFIX};
use insights_storage::spool;
use insights_telemetry::WebMetrics;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::middleware;

/// Shared state of the primary router.
#[derive(Clone)]
pub struct AppState {
    pub allow_list: AllowListManager,
    pub reports_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Build the primary router: ingest endpoints wrapped in endpoint
/// observation, the request timeout, and the mux counter (innermost to
/// outermost).
pub fn primary_router(
    state: AppState,
    metrics: Arc<WebMetrics>,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/upload/{app}", post(upload))
        .route("/{distribution}/desktop/{version}", post(upload_legacy))
        .route("/version", get(version))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            metrics.clone(),
            middleware::observe_endpoint,
        ))
        .layer(axum::middleware::from_fn_with_state(
            request_timeout,
            middleware::request_timeout,
        ))
        .layer(axum::middleware::from_fn_with_state(
            metrics,
            middleware::observe_mux,
        ))
}

/// `POST /upload/{app}`: canonical ingest, 202 on success.
async fn upload(
    State(state): State<AppState>,
    Path(app): Path<String>,
    request: Request,
) -> Response {
    ingest(&state, AppTag::new(app), request, StatusCode::ACCEPTED).await
}

/// `POST /{distribution}/desktop/{version}`: Ubuntu-Report
/// compatibility, 200 on success.
async fn upload_legacy(
    State(state): State<AppState>,
    Path((distribution, version)): Path<(String, String)>,
    request: Request,
) -> Response {
    let app = AppTag::new(format!("{LEGACY_PREFIX}{distribution}/desktop/{version}"));
    ingest(&state, app, request, StatusCode::OK).await
}

/// `GET /version`
async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

async fn ingest(
    state: &AppState,
    app: AppTag,
    request: Request,
    success: StatusCode,
) -> Response {
    let id = Uuid::new_v4();

    if !app.is_path_safe() {
        warn!(request_id = %id, app = %app, "rejecting unsafe app path");
        return StatusCode::FORBIDDEN.into_response();
    }
    if !state.allow_list.is_allowed(app.as_str()) {
        warn!(request_id = %id, app = %app, "app not in allow-list");
        return StatusCode::FORBIDDEN.into_response();
    }

    // Oversize bodies surface as a length-limit error here.
    let body = match to_bytes(request.into_body(), state.max_upload_bytes).await {
        Ok(body) => body,
        Err(e) => {
            warn!(request_id = %id, app = %app, error = %e, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    // Syntactic check only; schema enforcement happens at ingest time.
    if serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_err() {
        warn!(request_id = %id, app = %app, "request body is not JSON");
        return StatusCode::BAD_REQUEST.into_response();
    }

    match spool::write_report(&state.reports_dir, app.as_str(), id, &body) {
        Ok(path) => {
            info!(request_id = %id, app = %app, path = %path.display(), "report spooled");
            success.into_response()
        }
        Err(e) => {
            error!(request_id = %id, app = %app, error = %e, "failed to spool report");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
