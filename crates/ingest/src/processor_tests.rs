// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use insights_storage::{FakeSink, FakeUpload};
use prometheus::Registry;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    reports_dir: PathBuf,
    sink: Arc<FakeSink>,
    processor: Arc<Processor<FakeSink>>,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let reports_dir = dir.path().join("reports");
    let sink = Arc::new(FakeSink::new());
    let metrics = Arc::new(IngestMetrics::register(&Registry::new()).unwrap());
    let processor = Arc::new(Processor::new(
        Arc::clone(&sink),
        metrics,
        reports_dir.clone(),
        DEFAULT_MAX_IN_FLIGHT,
    ));
    Fixture {
        _dir: dir,
        reports_dir,
        sink,
        processor,
    }
}

fn place_report(reports_dir: &Path, app: &str, body: &[u8]) -> (Uuid, PathBuf) {
    let id = Uuid::new_v4();
    let dir = reports_dir.join(app);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{id}.json"));
    std::fs::write(&path, body).unwrap();
    (id, path)
}

const MODERN: &[u8] =
    br#"{"insightsVersion":"0.0.1","collectionTime":1747752692,"systemInfo":{}}"#;

#[tokio::test]
async fn modern_report_is_uploaded_and_deleted() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    let (id, path) = place_report(&fixture.reports_dir, "linux", MODERN);

    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();

    let uploads = fixture.sink.uploads();
    assert_eq!(uploads.len(), 1);
    match &uploads[0] {
        FakeUpload::Modern {
            id: row_id,
            app,
            report,
        } => {
            assert_eq!(*row_id, id);
            assert_eq!(app, "linux");
            assert!(!report.opt_out);
            assert_eq!(report.collection_time, Some(1747752692));
        }
        other => panic!("expected modern upload, got {other:?}"),
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn opt_out_report_uploads_a_null_row() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    let (_, path) = place_report(&fixture.reports_dir, "linux", br#"{"OptOut":true}"#);

    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();

    match &fixture.sink.uploads()[..] {
        [FakeUpload::Modern { report, .. }] => {
            assert!(report.opt_out);
            assert!(report.holds_opt_out_invariant());
        }
        other => panic!("expected one modern upload, got {other:?}"),
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn invalid_report_is_quarantined_exactly_once() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    let (id, path) = place_report(&fixture.reports_dir, "linux", b"{not json");

    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();

    match &fixture.sink.uploads()[..] {
        [FakeUpload::Invalid {
            id: row_id,
            app,
            raw_report,
        }] => {
            assert_eq!(*row_id, id);
            assert_eq!(app, "linux");
            assert_eq!(raw_report, "{not json");
        }
        other => panic!("expected one invalid upload, got {other:?}"),
    }
    assert!(!path.exists());

    // A second pass finds nothing left to quarantine.
    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fixture.sink.upload_count(), 1);
}

#[tokio::test]
async fn legacy_report_routes_to_the_legacy_sink() {
    let fixture = fixture();
    let app = AppTag::new("ubuntu-report/ubuntu/desktop/24.04");
    let body = br#"{"Version":"24.04"}"#;
    place_report(&fixture.reports_dir, "ubuntu-report/ubuntu/desktop/24.04", body);

    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();

    match &fixture.sink.uploads()[..] {
        [FakeUpload::Legacy {
            distribution,
            version,
            report,
            ..
        }] => {
            assert_eq!(distribution, "ubuntu");
            assert_eq!(version, "24.04");
            assert!(!report.opt_out);
            assert_eq!(report.report.as_ref().unwrap()["Version"], "24.04");
        }
        other => panic!("expected one legacy upload, got {other:?}"),
    }
}

#[tokio::test]
async fn legacy_opt_out_has_a_null_report_column() {
    let fixture = fixture();
    let app = AppTag::new("ubuntu-report/ubuntu/desktop/24.04");
    place_report(
        &fixture.reports_dir,
        "ubuntu-report/ubuntu/desktop/24.04",
        br#"{"OptOut":true}"#,
    );

    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();

    match &fixture.sink.uploads()[..] {
        [FakeUpload::Legacy { report, .. }] => {
            assert!(report.opt_out);
            assert!(report.report.is_none());
        }
        other => panic!("expected one legacy upload, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_upload_keeps_the_file_for_the_next_pass() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    let (_, path) = place_report(&fixture.reports_dir, "linux", MODERN);

    fixture.sink.fail_target("linux");
    let err = fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProcessError::DatabaseErrors { count: 1, .. }
    ));
    assert!(path.exists(), "file must survive a failed upload");

    // Next pass succeeds once the database is back.
    fixture.sink.restore_target("linux");
    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!path.exists());
    assert_eq!(fixture.sink.upload_count(), 1);
}

#[tokio::test]
async fn missing_table_is_fatal_for_the_pass() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    place_report(&fixture.reports_dir, "linux", MODERN);

    fixture.sink.drop_table("linux");
    let err = fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::MissingTable { .. }));
}

#[tokio::test]
async fn tmp_and_non_uuid_files_are_left_alone() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    let dir = fixture.reports_dir.join("linux");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("in-flight.tmp"), b"{").unwrap();
    std::fs::write(dir.join("readme.json"), b"{}").unwrap();

    fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fixture.sink.upload_count(), 0);
    assert!(dir.join("in-flight.tmp").exists());
    assert!(dir.join("readme.json").exists());
}

#[tokio::test]
async fn empty_spool_is_a_clean_pass() {
    let fixture = fixture();
    fixture
        .processor
        .process_app(&AppTag::new("linux"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fixture.sink.upload_count(), 0);
}

#[tokio::test]
async fn mixed_batch_counts_failures_and_still_processes_the_rest() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    place_report(&fixture.reports_dir, "linux", MODERN);
    place_report(&fixture.reports_dir, "linux", b"{not json");

    // Only the per-app table fails; quarantine still works.
    fixture.sink.fail_target("linux");
    let err = fixture
        .processor
        .process_app(&app, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::DatabaseErrors { count: 1, .. }));

    // The invalid file was quarantined and removed; the modern one kept.
    assert_eq!(fixture.sink.upload_count(), 1);
    assert_eq!(spool::list_reports(&fixture.reports_dir.join("linux")).unwrap().len(), 1);
}

#[tokio::test]
async fn cancellation_stops_dispatching_new_files() {
    let fixture = fixture();
    let app = AppTag::new("linux");
    for _ in 0..5 {
        place_report(&fixture.reports_dir, "linux", MODERN);
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    fixture.processor.process_app(&app, &cancel).await.unwrap();

    assert_eq!(fixture.sink.upload_count(), 0);
}
