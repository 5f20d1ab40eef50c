// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake report sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::db::SinkError;
use crate::models::{LegacyReport, TargetedReport};
use crate::sink::ReportSink;

/// Recorded upload call
#[derive(Debug, Clone)]
pub enum FakeUpload {
    Modern {
        id: Uuid,
        app: String,
        report: TargetedReport,
    },
    Legacy {
        id: Uuid,
        distribution: String,
        version: String,
        report: LegacyReport,
    },
    Invalid {
        id: Uuid,
        app: String,
        raw_report: String,
    },
}

#[derive(Default)]
struct FakeSinkState {
    uploads: Vec<FakeUpload>,
    failing_targets: HashSet<String>,
    missing_tables: HashSet<String>,
    delay: Option<Duration>,
}

/// Fake report sink for testing
#[derive(Clone, Default)]
pub struct FakeSink {
    inner: Arc<Mutex<FakeSinkState>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload to `target` fails with a database error.
    pub fn fail_target(&self, target: &str) {
        self.inner.lock().failing_targets.insert(target.to_string());
    }

    /// Uploads to `target` succeed again.
    pub fn restore_target(&self, target: &str) {
        self.inner.lock().failing_targets.remove(target);
    }

    /// Uploads to `target` fail as if its table were missing.
    pub fn drop_table(&self, target: &str) {
        self.inner.lock().missing_tables.insert(target.to_string());
    }

    /// Every upload stalls for `delay` before completing.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = Some(delay);
    }

    /// Snapshot of all recorded uploads, in call order.
    pub fn uploads(&self) -> Vec<FakeUpload> {
        self.inner.lock().uploads.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.inner.lock().uploads.len()
    }

    async fn apply_delay(&self) {
        let delay = self.inner.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_target(&self, target: &str) -> Result<(), SinkError> {
        let state = self.inner.lock();
        if state.missing_tables.contains(target) {
            return Err(SinkError::MissingTable(target.to_string()));
        }
        if state.failing_targets.contains(target) {
            return Err(SinkError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportSink for FakeSink {
    async fn upload(&self, id: Uuid, app: &str, report: &TargetedReport) -> Result<(), SinkError> {
        self.apply_delay().await;
        self.check_target(app)?;
        self.inner.lock().uploads.push(FakeUpload::Modern {
            id,
            app: app.to_string(),
            report: report.clone(),
        });
        Ok(())
    }

    async fn upload_legacy(
        &self,
        id: Uuid,
        distribution: &str,
        version: &str,
        report: &LegacyReport,
    ) -> Result<(), SinkError> {
        self.apply_delay().await;
        self.check_target("ubuntu_report")?;
        self.inner.lock().uploads.push(FakeUpload::Legacy {
            id,
            distribution: distribution.to_string(),
            version: version.to_string(),
            report: report.clone(),
        });
        Ok(())
    }

    async fn upload_invalid(&self, id: Uuid, app: &str, raw_report: &str) -> Result<(), SinkError> {
        self.apply_delay().await;
        self.check_target("invalid_reports")?;
        self.inner.lock().uploads.push(FakeUpload::Invalid {
            id,
            app: app.to_string(),
            raw_report: raw_report.to_string(),
        });
        Ok(())
    }
}
