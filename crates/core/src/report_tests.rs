// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const FULL_REPORT: &str = r#"{
  "insightsVersion": "0.0.1",
  "collectionTime": 1747752692,
  "systemInfo": {
    "hardware": {
      "product": {"family": "ThinkPad", "name": "X1", "vendor": "LENOVO"},
      "cpu": {"name": "i7-1260P", "vendor": "GenuineIntel", "architecture": "x86_64",
              "cpus": 16, "sockets": 1, "coresPerSocket": 12, "threadsPerCore": 2},
      "gpus": [{"device": "46a6", "vendor": "8086", "driver": "i915"}],
      "mem": {"size": 32768},
      "blks": [{"name": "nvme0n1", "size": 512000, "partitions": [{"size": 511000}]}],
      "screens": [{"size": "300mm x 190mm", "resolution": "1920x1200", "refreshRate": "60"}]
    },
    "software": {
      "os": {"family": "linux", "distribution": "Ubuntu", "version": "24.04", "edition": "desktop"},
      "timezone": "UTC",
      "lang": "en_US",
      "bios": {"vendor": "LENOVO", "version": "N3AET82W"}
    },
    "platform": {
      "desktop": {"desktopEnvironment": "ubuntu:GNOME", "sessionName": "ubuntu", "sessionType": "wayland"},
      "proAttached": true
    }
  }
}"#;

#[test]
fn full_report_round_trips() {
    let report: Report = serde_json::from_str(FULL_REPORT).unwrap();
    assert_eq!(report.insights_version.as_deref(), Some("0.0.1"));
    assert_eq!(report.collection_time, Some(1747752692));
    let info = report.system_info.as_ref().unwrap();
    assert_eq!(
        info.hardware.as_ref().unwrap().cpu.as_ref().unwrap().cpus,
        Some(16)
    );

    let encoded = serde_json::to_string(&report).unwrap();
    let decoded: Report = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, report);
}

#[test]
fn unknown_top_level_field_is_rejected() {
    let err = serde_json::from_str::<Report>(r#"{"insightsVersion": "1", "surprise": 1}"#);
    assert!(err.is_err());
}

#[test]
fn unknown_nested_field_is_rejected() {
    let raw = r#"{"systemInfo": {"hardware": {"cpu": {"speed": "fast"}}}}"#;
    assert!(serde_json::from_str::<Report>(raw).is_err());
}

#[test]
fn opt_out_marker_decodes() {
    let report: Report = serde_json::from_str(r#"{"OptOut": true}"#).unwrap();
    assert_eq!(report.opt_out, Some(true));
    assert!(report.system_info.is_none());
}

#[test]
fn collection_time_accepts_negative_and_large_values() {
    for time in [i64::MIN, -1, 0, i64::MAX] {
        let raw = format!(r#"{{"collectionTime": {time}}}"#);
        let report: Report = serde_json::from_str(&raw).unwrap();
        assert_eq!(report.collection_time, Some(time));
    }
}

#[test]
fn skipped_fields_are_omitted_from_output() {
    let encoded = serde_json::to_string(&Report {
        opt_out: Some(true),
        ..Report::default()
    })
    .unwrap();
    assert_eq!(encoded, r#"{"OptOut":true}"#);
}
