// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP-side metric families.

use prometheus::{
    exponential_buckets, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
};

/// Labeled series recorded by the web service's middleware.
///
/// Registration fails loudly if a family is already registered; there
/// is exactly one owner per registry.
#[derive(Debug, Clone)]
pub struct WebMetrics {
    /// `http_mux_requests_total{handler, method, code}`
    pub mux_requests: IntCounterVec,
    /// `http_endpoint_requests_total{handler, method, code, path}`
    pub endpoint_requests: IntCounterVec,
    /// `http_endpoint_request_duration_seconds{handler, method, code, path}`
    pub endpoint_duration: HistogramVec,
    /// `http_endpoint_request_size_bytes{handler, method, code, path}`
    pub endpoint_size: HistogramVec,
}

const ENDPOINT_LABELS: &[&str] = &["handler", "method", "code", "path"];

impl WebMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let mux_requests = IntCounterVec::new(
            Opts::new("http_mux_requests_total", "Requests seen by the mux."),
            &["handler", "method", "code"],
        )?;
        registry.register(Box::new(mux_requests.clone()))?;

        let endpoint_requests = IntCounterVec::new(
            Opts::new(
                "http_endpoint_requests_total",
                "Requests completed per endpoint.",
            ),
            ENDPOINT_LABELS,
        )?;
        registry.register(Box::new(endpoint_requests.clone()))?;

        let endpoint_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_endpoint_request_duration_seconds",
                "Request handling time per endpoint.",
            )
            // 5ms doubling up to ~10s.
            .buckets(exponential_buckets(0.005, 2.0, 12)?),
            ENDPOINT_LABELS,
        )?;
        registry.register(Box::new(endpoint_duration.clone()))?;

        let endpoint_size = HistogramVec::new(
            HistogramOpts::new(
                "http_endpoint_request_size_bytes",
                "Request body size per endpoint.",
            )
            .buckets(exponential_buckets(64.0, 4.0, 8)?),
            ENDPOINT_LABELS,
        )?;
        registry.register(Box::new(endpoint_size.clone()))?;

        Ok(Self {
            mux_requests,
            endpoint_requests,
            endpoint_duration,
            endpoint_size,
        })
    }

    /// Record one completed request at the endpoint level.
    pub fn observe_request(
        &self,
        handler: &str,
        method: &str,
        code: u16,
        path: &str,
        duration_seconds: f64,
        size_bytes: f64,
    ) {
        let code = code.to_string();
        let labels = &[handler, method, code.as_str(), path];
        self.endpoint_requests.with_label_values(labels).inc();
        self.endpoint_duration
            .with_label_values(labels)
            .observe(duration_seconds);
        self.endpoint_size
            .with_label_values(labels)
            .observe(size_bytes);
    }

    /// Record one completed request at the mux level.
    pub fn observe_mux(&self, handler: &str, method: &str, code: u16) {
        self.mux_requests
            .with_label_values(&[handler, method, code.to_string().as_str()])
            .inc();
    }
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
