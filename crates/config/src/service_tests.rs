// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn full_file_parses() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("service.yaml");
    std::fs::write(
        &path,
        r#"
verbosity: 2
reportsDir: /var/lib/ubuntu-insights/reports
database:
  host: db.internal
  port: 5433
  user: insights
  password: hunter2
  name: insights
  sslmode: require
listen:
  host: 0.0.0.0
  port: 8080
metrics:
  port: 2112
timeouts:
  readSeconds: 5
  writeSeconds: 10
  requestSeconds: 3
maxUploadBytes: 131072
"#,
    )
    .unwrap();

    let file = ServiceFile::load(&path).unwrap();
    assert_eq!(file.verbosity, Some(2));
    assert_eq!(
        file.reports_dir.as_deref(),
        Some(Path::new("/var/lib/ubuntu-insights/reports"))
    );
    assert_eq!(file.database.host.as_deref(), Some("db.internal"));
    assert_eq!(file.database.port, Some(5433));
    assert_eq!(file.listen.port, Some(8080));
    assert_eq!(file.metrics.port, Some(2112));
    assert_eq!(file.metrics.host, None);
    assert_eq!(file.timeouts.request_seconds, Some(3));
    assert_eq!(file.max_upload_bytes, Some(131072));
    assert_eq!(file.max_header_bytes, None);
}

#[test]
fn empty_file_is_all_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("service.yaml");
    std::fs::write(&path, "{}").unwrap();

    assert_eq!(ServiceFile::load(&path).unwrap(), ServiceFile::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("service.yaml");
    std::fs::write(&path, "verbostiy: 1\n").unwrap();

    assert!(matches!(
        ServiceFile::load(&path),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn load_optional_without_path_is_default() {
    assert_eq!(
        ServiceFile::load_optional(None).unwrap(),
        ServiceFile::default()
    );
}

#[test]
fn load_optional_surfaces_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.yaml");
    assert!(matches!(
        ServiceFile::load_optional(Some(&path)),
        Err(ConfigError::Io(_))
    ));
}
