// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row models for the three sinks.
//!
//! Constructors enforce the opt-out invariant: a row is either an
//! opt-out with every structured column NULL, or an opt-in with at
//! least one structured column set.

use insights_core::Report;
use serde_json::Value;

/// One row of a per-app table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetedReport {
    pub opt_out: bool,
    pub insights_version: Option<String>,
    pub collection_time: Option<i64>,
    pub hardware: Option<Value>,
    pub software: Option<Value>,
    pub platform: Option<Value>,
    pub source_metrics: Option<Value>,
}

impl TargetedReport {
    /// Row for the bare opt-out marker.
    pub fn from_opt_out() -> Self {
        Self {
            opt_out: true,
            ..Self::default()
        }
    }

    /// Row for a well-formed v1 report.
    pub fn from_report(report: &Report) -> Result<Self, serde_json::Error> {
        let info = report.system_info.as_ref();
        Ok(Self {
            opt_out: false,
            insights_version: report.insights_version.clone(),
            collection_time: report.collection_time,
            hardware: to_column(info.and_then(|i| i.hardware.as_ref()))?,
            software: to_column(info.and_then(|i| i.software.as_ref()))?,
            platform: to_column(info.and_then(|i| i.platform.as_ref()))?,
            source_metrics: report.source_metrics.clone(),
        })
    }

    /// `(opt_out == true) ⇔ (all structured columns NULL)`.
    pub fn holds_opt_out_invariant(&self) -> bool {
        let any_set = self.insights_version.is_some()
            || self.collection_time.is_some()
            || self.hardware.is_some()
            || self.software.is_some()
            || self.platform.is_some()
            || self.source_metrics.is_some();
        self.opt_out != any_set
    }
}

fn to_column<T: serde::Serialize>(value: Option<&T>) -> Result<Option<Value>, serde_json::Error> {
    value.map(serde_json::to_value).transpose()
}

/// One row of the shared `ubuntu_report` table.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyReport {
    pub opt_out: bool,
    /// Raw report JSON; NULL iff opt-out.
    pub report: Option<Value>,
}

impl LegacyReport {
    pub fn from_opt_out() -> Self {
        Self {
            opt_out: true,
            report: None,
        }
    }

    pub fn from_value(report: Value) -> Self {
        Self {
            opt_out: false,
            report: Some(report),
        }
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
