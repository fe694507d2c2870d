//! Decoding of real QR codes through the page scanner.

use examsplit::config::{HalfPageOrder, ScanOptions};
use examsplit::output::RunObserver;
use examsplit::rebuild::Reconstructor;
use examsplit::scan::{CancelFlag, PageScanner, Placement, group};
use examsplit::source::SourceDocument;
use std::sync::Arc;

use crate::common::{Drawing, Side, ZOOM, a3, a4, a4_blank, code_only_document, scan_document};

async fn scan_single(document: lopdf::Document) -> examsplit::scan::PageScan {
    let source = Arc::new(SourceDocument::new(document));
    let options = ScanOptions {
        fast_decode_only: true,
        ..ScanOptions::default()
    };
    PageScanner::new(&options, ZOOM, 1)
        .scan(source, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap()
        .remove(0)
}

#[tokio::test]
async fn test_placement_follows_where_the_code_is_drawn() {
    // A3 landscape; the code image covers only a small part of the sheet.
    let right = scan_single(code_only_document("Frank_606", 1191.0, 842.0, 760.0, 560.0, Drawing::PlacedImage)).await;
    assert_eq!(right.outcome.payload.as_deref(), Some("Frank_606"));
    assert_eq!(right.outcome.placement, Placement::Right);

    let left = scan_single(code_only_document("Frank_606", 1191.0, 842.0, 60.0, 560.0, Drawing::PlacedImage)).await;
    assert_eq!(left.outcome.placement, Placement::Left);
}

#[tokio::test]
async fn test_vector_code_is_read() {
    let scan = scan_single(code_only_document("Grace_707", 595.0, 842.0, 40.0, 560.0, Drawing::Vector)).await;
    assert_eq!(scan.outcome.payload.as_deref(), Some("Grace_707"));
    assert_eq!(scan.outcome.placement, Placement::Left);
    assert!(scan.raster_error.is_none());
}

fn source() -> Arc<SourceDocument> {
    Arc::new(SourceDocument::new(scan_document(&[
        a4("Alice_101"),
        a4_blank(),
        a3("Bob_202", Side::Right),
        a4("Alice_101"),
    ])))
}

#[tokio::test]
async fn test_fast_and_full_agree_on_straight_codes() {
    let source = source();
    let options = ScanOptions::default();
    let fast = ScanOptions {
        fast_decode_only: true,
        ..options
    };

    let full = PageScanner::new(&options, ZOOM, 2)
        .scan_and_assign(Arc::clone(&source), &options, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();
    let quick = PageScanner::new(&fast, ZOOM, 2)
        .scan_and_assign(source, &fast, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(full, quick);
    assert_eq!(full.records[0].angle, Some(0));
    assert_eq!(full.records[2].placement, Placement::Right);
    assert_eq!(full.unassigned, vec![1]);
}

#[tokio::test]
async fn test_scan_is_idempotent() {
    let source = source();
    let options = ScanOptions {
        infer_continuation: true,
        split_oversized: true,
        fast_decode_only: true,
    };
    let scanner = PageScanner::new(&options, ZOOM, 3);
    let reconstructor = Reconstructor::new(options.split_oversized, HalfPageOrder::default());

    let mut runs = Vec::new();
    for _ in 0..2 {
        let assignment = scanner
            .scan_and_assign(Arc::clone(&source), &options, &RunObserver::silent(), &CancelFlag::new())
            .await
            .unwrap();
        let plans: Vec<_> = group(&assignment.records)
            .iter()
            .map(|student| reconstructor.reconstruct(student))
            .collect();
        runs.push((assignment, plans));
    }

    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_result_order_does_not_depend_on_jobs() {
    let source = source();
    let options = ScanOptions {
        fast_decode_only: true,
        ..ScanOptions::default()
    };

    let sequential = PageScanner::new(&options, ZOOM, 1)
        .scan_and_assign(Arc::clone(&source), &options, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();
    let parallel = PageScanner::new(&options, ZOOM, 4)
        .scan_and_assign(source, &options, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(sequential, parallel);
    let indices: Vec<usize> = parallel.records.iter().map(|r| r.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}
