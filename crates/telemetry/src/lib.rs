// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! insights-telemetry: Prometheus metric families for the server

pub mod http;
mod ingest;
mod web;

pub use http::metrics_router;
pub use ingest::IngestMetrics;
pub use web::WebMetrics;

use prometheus::{Registry, TextEncoder};

/// Render `registry` in the Prometheus text exposition format.
pub fn render(registry: &Registry) -> Result<String, prometheus::Error> {
    TextEncoder::new().encode_to_string(&registry.gather())
}
