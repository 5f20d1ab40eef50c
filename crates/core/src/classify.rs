// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report classification: decide which sink a raw payload belongs to.

use crate::app::AppTag;
use crate::report::Report;
use serde_json::Value;

/// Outcome of classifying a raw report for a given app.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportClass {
    /// The bare opt-out marker for a modern app.
    OptOut,
    /// A well-formed v1 report.
    Modern(Box<Report>),
    /// An Ubuntu-Report payload; `report` is `None` for legacy opt-out.
    Legacy { report: Option<Value> },
    /// Failed to parse, or parsed but failed the schema.
    Invalid,
}

/// Classify raw bytes for `app`.
///
/// Legacy apps (`ubuntu-report/...`) skip the strict envelope decode:
/// the legacy table stores any JSON object verbatim. Everything else is
/// decoded with unknown fields rejected, falling back to a permissive
/// opt-out check so that `{"OptOut": true}` survives schema drift.
pub fn classify(raw: &[u8], app: &AppTag) -> ReportClass {
    if app.is_legacy() {
        return classify_legacy(raw);
    }

    match serde_json::from_slice::<Report>(raw) {
        Ok(report) => classify_envelope(report),
        Err(_) => match serde_json::from_slice::<Value>(raw) {
            Ok(value) if is_bare_opt_out(&value) => ReportClass::OptOut,
            _ => ReportClass::Invalid,
        },
    }
}

fn classify_envelope(report: Report) -> ReportClass {
    let has_payload = report.insights_version.is_some()
        || report.collection_time.is_some()
        || report.system_info.is_some()
        || report.source_metrics.is_some();

    match report.opt_out {
        // Opt-out must be the only populated field.
        Some(true) if has_payload => ReportClass::Invalid,
        Some(true) => ReportClass::OptOut,
        _ => {
            if report.insights_version.is_some()
                && report.collection_time.is_some()
                && report.system_info.is_some()
            {
                ReportClass::Modern(Box::new(report))
            } else {
                ReportClass::Invalid
            }
        }
    }
}

fn classify_legacy(raw: &[u8]) -> ReportClass {
    let value: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(_) => return ReportClass::Invalid,
    };
    let Some(map) = value.as_object() else {
        return ReportClass::Invalid;
    };

    match map.get("OptOut").and_then(Value::as_bool) {
        Some(true) if map.len() == 1 => ReportClass::Legacy { report: None },
        // An opt-out marker buried in a larger document is not a valid
        // legacy report and not a valid opt-out either.
        Some(true) => ReportClass::Invalid,
        _ => ReportClass::Legacy {
            report: Some(value),
        },
    }
}

fn is_bare_opt_out(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.len() == 1 && map.get("OptOut").and_then(Value::as_bool) == Some(true))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
