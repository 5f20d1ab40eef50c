// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request middleware: timeout enforcement and metric observation.
//!
//! The router attaches the matched path to each request; the observers
//! read it back so the path label is the route template, never the raw
//! URI.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use insights_telemetry::WebMetrics;

/// Answer 503 when a handler overruns the request timeout.
pub async fn request_timeout(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Record `http_endpoint_*` series for matched routes.
pub async fn observe_endpoint(
    State(metrics): State<Arc<WebMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(path) = matched_path(&request) else {
        // Unmatched requests are counted at the mux level only.
        return next.run(request).await;
    };
    let method = request.method().as_str().to_owned();
    let size = content_length(&request);
    let handler = handler_label(&path);

    let start = Instant::now();
    let response = next.run(request).await;

    metrics.observe_request(
        handler,
        &method,
        response.status().as_u16(),
        &path,
        start.elapsed().as_secs_f64(),
        size,
    );
    response
}

/// Record `http_mux_requests_total` for every request, including
/// unmatched paths and timed-out handlers.
pub async fn observe_mux(
    State(metrics): State<Arc<WebMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let handler = matched_path(&request)
        .map(|path| handler_label(&path))
        .unwrap_or("unmatched");
    let method = request.method().as_str().to_owned();

    let response = next.run(request).await;

    metrics.observe_mux(handler, &method, response.status().as_u16());
    response
}

fn matched_path(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
}

fn content_length(request: &Request) -> f64 {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub(crate) fn handler_label(path: &str) -> &'static str {
    match path {
        "/upload/{app}" => "upload",
        "/{distribution}/desktop/{version}" => "legacy-upload",
        "/version" => "version",
        "/metrics" => "metrics",
        _ => "unmatched",
    }
}
