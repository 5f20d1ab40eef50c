// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One processing pass over an app's spool directory.
//!
//! Each file is read, classified, uploaded to the matching sink, and
//! deleted only after the insert succeeded. A failed upload leaves the
//! file in place for the next pass. A single bad file never fails the
//! pass; database failures are counted and joined into the returned
//! error so the worker can surface them without aborting siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use insights_core::{classify, AppTag, ReportClass};
use insights_storage::{spool, LegacyReport, ReportSink, SinkError, TargetedReport};
use insights_telemetry::IngestMetrics;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default bound on concurrent per-file uploads within one app.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Errors surfaced by a processing pass.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{count} upload(s) failed for '{app}'; last: {last}")]
    DatabaseErrors {
        app: String,
        count: usize,
        last: String,
    },
    #[error("table for '{app}' is missing")]
    MissingTable { app: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload outcome, as recorded in the `result` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Modern,
    Legacy,
    OptOut,
    Invalid,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Modern => "modern",
            Outcome::Legacy => "legacy",
            Outcome::OptOut => "optout",
            Outcome::Invalid => "invalid",
        }
    }
}

/// Result of handling a single spool file.
enum FileResult {
    Done,
    /// Upload failed; the file stays for the next pass.
    UploadFailed(SinkError),
    /// The app's table is gone; the worker must stop.
    MissingTable,
    Skipped,
}

/// Classifies and uploads spool files for any number of apps.
pub struct Processor<S> {
    sink: Arc<S>,
    metrics: Arc<IngestMetrics>,
    reports_dir: PathBuf,
    max_in_flight: usize,
}

// Clones share the sink and metrics; only handles are copied.
impl<S> Clone for Processor<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            metrics: Arc::clone(&self.metrics),
            reports_dir: self.reports_dir.clone(),
            max_in_flight: self.max_in_flight,
        }
    }
}

impl<S: ReportSink + 'static> Processor<S> {
    pub fn new(
        sink: Arc<S>,
        metrics: Arc<IngestMetrics>,
        reports_dir: PathBuf,
        max_in_flight: usize,
    ) -> Self {
        Self {
            sink,
            metrics,
            reports_dir,
            max_in_flight,
        }
    }

    /// Run one pass over `<reports_dir>/<app>/`.
    pub async fn process_app(
        &self,
        app: &AppTag,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        let dir = self.reports_dir.join(app.as_str());
        let start = Instant::now();
        let files = spool::list_reports(&dir)?;
        debug!(app = %app, files = files.len(), "processing pass");

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        for path in files {
            if cancel.is_cancelled() {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let processor = self.clone();
            let app = app.clone();
            tasks.spawn(async move {
                let _permit = permit;
                processor.process_file(&app, &path).await
            });
        }

        let mut db_errors = 0usize;
        let mut last_error = None;
        let mut missing_table = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(FileResult::Done) | Ok(FileResult::Skipped) => {}
                Ok(FileResult::UploadFailed(e)) => {
                    db_errors += 1;
                    last_error = Some(e.to_string());
                }
                Ok(FileResult::MissingTable) => missing_table = true,
                Err(e) => {
                    error!(app = %app, error = %e, "file task failed");
                    db_errors += 1;
                    last_error = Some(e.to_string());
                }
            }
        }

        let (count, bytes) = spool::dir_stats(&dir)?;
        self.metrics
            .set_cache_stats(app.as_str(), count as i64, bytes as i64);
        self.metrics
            .observe_pass(app.as_str(), start.elapsed().as_secs_f64());

        if missing_table {
            return Err(ProcessError::MissingTable {
                app: app.to_string(),
            });
        }
        if db_errors > 0 {
            return Err(ProcessError::DatabaseErrors {
                app: app.to_string(),
                count: db_errors,
                last: last_error.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn process_file(&self, app: &AppTag, path: &Path) -> FileResult {
        let Some(id) = spool::report_id(path) else {
            warn!(app = %app, path = %path.display(), "skipping file without a UUID name");
            return FileResult::Skipped;
        };

        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(app = %app, report_id = %id, error = %e, "failed to read report; will retry");
                self.metrics.observe_file(app.as_str(), "error");
                self.metrics.observe_error(app.as_str());
                return FileResult::Skipped;
            }
        };

        let (outcome, upload) = self.upload_classified(id, app, &raw).await;
        match upload {
            Ok(()) => {
                self.metrics.observe_file(app.as_str(), outcome.as_str());
                // The row is committed; a stale file is only noise.
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(app = %app, report_id = %id, error = %e, "stale spool file after upload");
                }
                debug!(app = %app, report_id = %id, result = outcome.as_str(), "report ingested");
                FileResult::Done
            }
            Err(SinkError::MissingTable(table)) => {
                error!(app = %app, table = %table, "table missing; aborting worker");
                self.metrics.observe_file(app.as_str(), "error");
                self.metrics.observe_error(app.as_str());
                FileResult::MissingTable
            }
            Err(e) => {
                warn!(app = %app, report_id = %id, error = %e, "upload failed; keeping file");
                self.metrics.observe_file(app.as_str(), "error");
                self.metrics.observe_error(app.as_str());
                FileResult::UploadFailed(e)
            }
        }
    }

    /// Classify `raw` and route it to the matching sink call.
    async fn upload_classified(
        &self,
        id: Uuid,
        app: &AppTag,
        raw: &[u8],
    ) -> (Outcome, Result<(), SinkError>) {
        match classify(raw, app) {
            ReportClass::OptOut => (
                Outcome::OptOut,
                self.sink
                    .upload(id, app.as_str(), &TargetedReport::from_opt_out())
                    .await,
            ),
            ReportClass::Modern(report) => match TargetedReport::from_report(&report) {
                Ok(row) => (Outcome::Modern, self.sink.upload(id, app.as_str(), &row).await),
                Err(e) => {
                    warn!(app = %app, report_id = %id, error = %e, "report not serializable; quarantining");
                    self.quarantine(id, app, raw).await
                }
            },
            ReportClass::Legacy { report } => match app.legacy_target() {
                Some(target) => {
                    let outcome = if report.is_some() {
                        Outcome::Legacy
                    } else {
                        Outcome::OptOut
                    };
                    let row = match report {
                        Some(value) => LegacyReport::from_value(value),
                        None => LegacyReport::from_opt_out(),
                    };
                    (
                        outcome,
                        self.sink
                            .upload_legacy(id, &target.distribution, &target.version, &row)
                            .await,
                    )
                }
                None => {
                    warn!(app = %app, report_id = %id, "malformed legacy tag; quarantining");
                    self.quarantine(id, app, raw).await
                }
            },
            ReportClass::Invalid => self.quarantine(id, app, raw).await,
        }
    }

    async fn quarantine(
        &self,
        id: Uuid,
        app: &AppTag,
        raw: &[u8],
    ) -> (Outcome, Result<(), SinkError>) {
        let raw_report = String::from_utf8_lossy(raw);
        info!(app = %app, report_id = %id, "quarantining invalid report");
        (
            Outcome::Invalid,
            self.sink
                .upload_invalid(id, app.as_str(), &raw_report)
                .await,
        )
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
