// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sink seam between the ingest daemon and persistence.

use uuid::Uuid;

use crate::db::SinkError;
use crate::models::{LegacyReport, TargetedReport};

/// Typed insert APIs for the three report destinations.
///
/// Each call writes exactly one row keyed by the per-upload UUID. A
/// failed call leaves the on-disk source untouched; a successful
/// insert is the precondition for deleting it.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Insert into the per-app table named `app`.
    async fn upload(&self, id: Uuid, app: &str, report: &TargetedReport) -> Result<(), SinkError>;

    /// Insert into the shared `ubuntu_report` table.
    async fn upload_legacy(
        &self,
        id: Uuid,
        distribution: &str,
        version: &str,
        report: &LegacyReport,
    ) -> Result<(), SinkError>;

    /// Quarantine into `invalid_reports`.
    async fn upload_invalid(&self, id: Uuid, app: &str, raw_report: &str) -> Result<(), SinkError>;
}
