//! Package output, dry runs, multiple inputs and cancellation.

use examsplit::config::{FolderNaming, OverwriteMode};
use examsplit::error::ExamSplitError;
use examsplit::output::{Logger, MessageLevel, NoopProgress, RunObserver};
use examsplit::package::{PackageWriter, SUMMARY_JSON, SUMMARY_PDF};
use examsplit::scan::CancelFlag;
use examsplit::split_exam;
use std::sync::Arc;
use tempfile::TempDir;

use crate::common::{a4, a4_blank, page_count, recording_observer, test_config, write_scan};

/// Sets the cancel flag when a message containing `trigger` is logged.
struct CancelOn {
    trigger: &'static str,
    cancel: CancelFlag,
}

impl Logger for CancelOn {
    fn emit(&self, message: &str, _level: MessageLevel) {
        if message.contains(self.trigger) {
            self.cancel.cancel();
        }
    }
}

#[tokio::test]
async fn test_package_layout_and_summary() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[a4("Alice_101"), a4_blank(), a4("Bob_202")],
    );
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.fast_decode_only = true;
    config.naming = FolderNaming {
        prefix: "Teilnehmer".to_string(),
        suffix: "x".to_string(),
    };

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert!(output.join("Teilnehmer_101_x").join("Alice_101.pdf").exists());
    assert!(output.join("Teilnehmer_202_x").join("Bob_202.pdf").exists());
    assert_eq!(report.written.len(), 4);

    // overview + divider + 1 unassigned + 2 x (name page + 1 page)
    assert_eq!(page_count(&output.join(SUMMARY_PDF)), 7);

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(output.join(SUMMARY_JSON)).unwrap()).unwrap();
    assert_eq!(json["totalPages"], 3);
    assert_eq!(json["unassigned"], serde_json::json!([1]));
    assert_eq!(json["students"][0]["displayName"], "Alice");
    assert_eq!(json["students"][1]["routingKey"], "Bob_202");
}

#[tokio::test]
async fn test_no_json() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(temp.path(), "scan.pdf", &[a4("Alice_101")]);
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.fast_decode_only = true;
    config.write_json = false;

    split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert!(output.join(SUMMARY_PDF).exists());
    assert!(!output.join(SUMMARY_JSON).exists());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(temp.path(), "scan.pdf", &[a4("Alice_101"), a4("Bob_202")]);
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.fast_decode_only = true;
    config.dry_run = true;

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.summary.students.len(), 2);
    assert!(report.written.is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_inputs_are_concatenated_in_order() {
    let temp = TempDir::new().unwrap();
    let first = write_scan(temp.path(), "room-a.pdf", &[a4("Alice_101")]);
    let second = write_scan(temp.path(), "room-b.pdf", &[a4_blank(), a4("Bob_202")]);

    let mut config = test_config(vec![first, second], temp.path().join("graded"));
    config.options.infer_continuation = true;
    config.options.fast_decode_only = true;
    config.dry_run = true;

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.merge.files_merged, 2);
    assert_eq!(report.summary.total_pages, 3);
    // The blank first page of the second file continues the last page of the first.
    assert_eq!(report.documents[0].routing_key, "Alice_101");
    assert_eq!(report.documents[0].page_count(), 2);
}

#[tokio::test]
async fn test_continue_on_error_skips_broken_input() {
    let temp = TempDir::new().unwrap();
    let good = write_scan(temp.path(), "good.pdf", &[a4("Alice_101")]);
    let broken = temp.path().join("broken.pdf");
    std::fs::write(&broken, b"not a pdf").unwrap();

    let mut config = test_config(vec![broken.clone(), good.clone()], temp.path().join("graded"));
    config.options.fast_decode_only = true;
    config.dry_run = true;

    let err = split_exam(config.clone(), &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExamSplitError::FailedToLoadPdf { .. }));

    config.continue_on_error = true;
    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.merge.files_skipped, 1);
    assert_eq!(report.documents.len(), 1);
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(temp.path(), "scan.pdf", &[a4("Alice_101")]);
    let output = temp.path().join("graded");

    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = split_exam(test_config(vec![scan], output.clone()), &RunObserver::silent(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ExamSplitError::Cancelled));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_cancel_after_assignment_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(temp.path(), "scan.pdf", &[a4("Alice_101"), a4("Bob_202")]);
    let output = temp.path().join("graded");

    let cancel = CancelFlag::new();
    let logger = Arc::new(CancelOn {
        trigger: "All QR codes read.",
        cancel: cancel.clone(),
    });
    let observer = RunObserver::new(logger, Arc::new(NoopProgress));

    let mut config = test_config(vec![scan], output.clone());
    config.options.fast_decode_only = true;

    let err = split_exam(config, &observer, &cancel).await.unwrap_err();

    assert!(matches!(err, ExamSplitError::Cancelled));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_keys_with_the_same_file_name_do_not_overwrite_each_other() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(temp.path(), "scan.pdf", &[a4("A/B_1"), a4("A:B_1"), a4_blank()]);
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.fast_decode_only = true;
    config.options.infer_continuation = true;

    let (observer, logger) = recording_observer();
    let report = split_exam(config, &observer, &CancelFlag::new()).await.unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].routing_key, "A/B_1");
    assert_eq!(report.summary.failures.len(), 1);
    assert_eq!(report.summary.failures[0].routing_key, "A:B_1");
    assert!(logger.messages().iter().any(|(level, text)| {
        *level == MessageLevel::Error && text.starts_with("Could not create the document for A:B_1")
    }));

    let package = PackageWriter::new(&output, FolderNaming::default());
    assert_eq!(page_count(&package.student_path("A/B_1")), 1);
}

#[tokio::test]
async fn test_rerun_overwrites_with_force_and_refuses_with_no_clobber() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(temp.path(), "scan.pdf", &[a4("Alice_101")]);
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.fast_decode_only = true;

    split_exam(config.clone(), &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();
    split_exam(config.clone(), &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    config.overwrite_mode = OverwriteMode::NoClobber;
    let err = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExamSplitError::OutputExists { .. }));

    let package = PackageWriter::new(&output, FolderNaming::default());
    assert_eq!(page_count(&package.student_path("Alice_101")), 1);
}
