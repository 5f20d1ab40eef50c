// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn modern_app() -> AppTag {
    AppTag::new("linux")
}

fn legacy_app() -> AppTag {
    AppTag::new("ubuntu-report/ubuntu/desktop/24.04")
}

const MODERN: &str = r#"{
  "insightsVersion": "0.0.1",
  "collectionTime": 1747752692,
  "systemInfo": {"software": {"timezone": "UTC"}}
}"#;

#[test]
fn modern_report_classifies_as_modern() {
    match classify(MODERN.as_bytes(), &modern_app()) {
        ReportClass::Modern(report) => {
            assert_eq!(report.collection_time, Some(1747752692));
            assert_eq!(report.opt_out, None);
        }
        other => panic!("expected Modern, got {other:?}"),
    }
}

#[test]
fn bare_opt_out_classifies_as_opt_out() {
    assert_eq!(
        classify(br#"{"OptOut": true}"#, &modern_app()),
        ReportClass::OptOut
    );
}

#[parameterized(
    opt_out_with_known_field = { r#"{"OptOut": true, "insightsVersion": "1"}"# },
    opt_out_with_unknown_field = { r#"{"OptOut": true, "extra": 1}"# },
    opt_out_false_alone = { r#"{"OptOut": false}"# },
    missing_system_info = { r#"{"insightsVersion": "1", "collectionTime": 5}"# },
    missing_collection_time = { r#"{"insightsVersion": "1", "systemInfo": {}}"# },
    empty_object = { r#"{}"# },
    unknown_field = { r#"{"surprise": true}"# },
    not_an_object = { r#"[1, 2]"# },
    not_json = { r#"{not json"# },
    opt_out_string_value = { r#"{"OptOut": "true"}"# },
)]
fn invalid_modern_payloads(raw: &str) {
    assert_eq!(classify(raw.as_bytes(), &modern_app()), ReportClass::Invalid);
}

#[test]
fn opt_out_false_with_full_payload_is_modern() {
    let raw = r#"{
      "OptOut": false,
      "insightsVersion": "0.0.1",
      "collectionTime": 1,
      "systemInfo": {}
    }"#;
    assert!(matches!(
        classify(raw.as_bytes(), &modern_app()),
        ReportClass::Modern(_)
    ));
}

#[test]
fn legacy_object_is_stored_verbatim() {
    let raw = r#"{"Version": "18.04", "OEM": {"Vendor": "Dell"}}"#;
    match classify(raw.as_bytes(), &legacy_app()) {
        ReportClass::Legacy {
            report: Some(value),
        } => {
            assert_eq!(value["Version"], "18.04");
        }
        other => panic!("expected Legacy, got {other:?}"),
    }
}

#[test]
fn legacy_bare_opt_out_has_no_report() {
    assert_eq!(
        classify(br#"{"OptOut": true}"#, &legacy_app()),
        ReportClass::Legacy { report: None }
    );
}

#[test]
fn legacy_opt_out_with_extra_fields_is_invalid() {
    assert_eq!(
        classify(br#"{"OptOut": true, "Version": "18.04"}"#, &legacy_app()),
        ReportClass::Invalid
    );
}

#[test]
fn legacy_accepts_what_modern_rejects() {
    let raw = r#"{"surprise": true}"#;
    assert!(matches!(
        classify(raw.as_bytes(), &legacy_app()),
        ReportClass::Legacy { report: Some(_) }
    ));
    assert_eq!(classify(raw.as_bytes(), &modern_app()), ReportClass::Invalid);
}

#[parameterized(
    not_json = { r#"{not json"# },
    scalar = { r#"42"# },
    array = { r#"["a"]"# },
)]
fn legacy_non_objects_are_invalid(raw: &str) {
    assert_eq!(classify(raw.as_bytes(), &legacy_app()), ReportClass::Invalid);
}

#[test]
fn legacy_opt_out_false_is_just_another_field() {
    assert!(matches!(
        classify(br#"{"OptOut": false}"#, &legacy_app()),
        ReportClass::Legacy { report: Some(_) }
    ));
}
