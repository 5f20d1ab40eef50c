// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingest-side metric families.

use prometheus::{
    exponential_buckets, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
};

/// Labeled series recorded by the ingest daemon's workers.
#[derive(Debug, Clone)]
pub struct IngestMetrics {
    /// `ingest_processor_files_processed_total{app, result}`
    pub files_processed: IntCounterVec,
    /// `ingest_processor_process_duration_seconds{app}`
    pub process_duration: HistogramVec,
    /// `ingest_processor_cache_size{app}`
    pub cache_size: IntGaugeVec,
    /// `ingest_processor_cache_size_bytes{app}`
    pub cache_size_bytes: IntGaugeVec,
    /// `ingest_processor_errors_total{app}`
    pub errors: IntCounterVec,
}

impl IngestMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let files_processed = IntCounterVec::new(
            Opts::new(
                "ingest_processor_files_processed_total",
                "Spool files processed, by outcome.",
            ),
            &["app", "result"],
        )?;
        registry.register(Box::new(files_processed.clone()))?;

        let process_duration = HistogramVec::new(
            HistogramOpts::new(
                "ingest_processor_process_duration_seconds",
                "Duration of one processing pass.",
            )
            .buckets(exponential_buckets(0.005, 2.0, 12)?),
            &["app"],
        )?;
        registry.register(Box::new(process_duration.clone()))?;

        let cache_size = IntGaugeVec::new(
            Opts::new("ingest_processor_cache_size", "Spool files awaiting upload."),
            &["app"],
        )?;
        registry.register(Box::new(cache_size.clone()))?;

        let cache_size_bytes = IntGaugeVec::new(
            Opts::new(
                "ingest_processor_cache_size_bytes",
                "Bytes of spool files awaiting upload.",
            ),
            &["app"],
        )?;
        registry.register(Box::new(cache_size_bytes.clone()))?;

        let errors = IntCounterVec::new(
            Opts::new("ingest_processor_errors_total", "Upload failures."),
            &["app"],
        )?;
        registry.register(Box::new(errors.clone()))?;

        Ok(Self {
            files_processed,
            process_duration,
            cache_size,
            cache_size_bytes,
            errors,
        })
    }

    pub fn observe_file(&self, app: &str, result: &str) {
        self.files_processed.with_label_values(&[app, result]).inc();
    }

    pub fn observe_pass(&self, app: &str, duration_seconds: f64) {
        self.process_duration
            .with_label_values(&[app])
            .observe(duration_seconds);
    }

    pub fn set_cache_stats(&self, app: &str, files: i64, bytes: i64) {
        self.cache_size.with_label_values(&[app]).set(files);
        self.cache_size_bytes.with_label_values(&[app]).set(bytes);
    }

    pub fn observe_error(&self, app: &str) {
        self.errors.with_label_values(&[app]).inc();
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
