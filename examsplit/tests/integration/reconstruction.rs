//! Splitting of oversized sheets and page accounting.

use examsplit::config::{FolderNaming, HalfPageOrder};
use examsplit::output::{MessageLevel, RunObserver};
use examsplit::package::PackageWriter;
use examsplit::rebuild::PageContent;
use examsplit::rebuild::compose::media_box;
use examsplit::scan::CancelFlag;
use examsplit::source::HalfSide;
use examsplit::split_exam;
use lopdf::Document;
use tempfile::TempDir;

use crate::common::{
    Side, a3, a3_blank, a4, a4_blank, page_count, recording_observer, test_config, write_scan,
};

fn media_boxes(path: &std::path::Path) -> Vec<[f32; 4]> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|id| media_box(&doc, *id).unwrap())
        .collect()
}

#[tokio::test]
async fn test_oversized_pair_is_split_into_four_halves() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[a3("Erin_505", Side::Left), a3("Erin_505", Side::Right)],
    );
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.split_oversized = true;
    config.options.fast_decode_only = true;

    let (observer, logger) = recording_observer();
    let report = split_exam(config, &observer, &CancelFlag::new()).await.unwrap();

    assert_eq!(
        report.documents[0].pages,
        vec![
            PageContent::Half { source_index: 0, side: HalfSide::Right },
            PageContent::Half { source_index: 0, side: HalfSide::Left },
            PageContent::Half { source_index: 1, side: HalfSide::Left },
            PageContent::Half { source_index: 1, side: HalfSide::Right },
        ]
    );
    assert!(logger.contains(MessageLevel::Info, "Pages 1 and 2 will be split."));

    let package = PackageWriter::new(&output, FolderNaming::default());
    let boxes = media_boxes(&package.student_path("Erin_505"));
    assert_eq!(boxes.len(), 4);

    let x0: Vec<f32> = boxes.iter().map(|b| b[0]).collect();
    assert_eq!(x0, vec![595.5, 0.0, 0.0, 595.5]);
    for b in &boxes {
        assert!((b[2] - b[0] - 595.5).abs() < 0.01);
        assert!((b[3] - b[1] - 842.0).abs() < 0.01);
    }
}

#[tokio::test]
async fn test_booklet_order() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[a3("Erin_505", Side::Left), a3("Erin_505", Side::Right)],
    );

    let mut config = test_config(vec![scan], temp.path().join("graded"));
    config.options.split_oversized = true;
    config.options.fast_decode_only = true;
    config.half_page_order = HalfPageOrder::Booklet;
    config.dry_run = true;

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(
        report.documents[0].pages,
        vec![
            PageContent::Half { source_index: 0, side: HalfSide::Right },
            PageContent::Half { source_index: 1, side: HalfSide::Left },
            PageContent::Half { source_index: 1, side: HalfSide::Right },
            PageContent::Half { source_index: 0, side: HalfSide::Left },
        ]
    );
}

#[tokio::test]
async fn test_oversized_page_followed_by_inferred_page_is_split() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[a3("Erin_505", Side::Left), a3_blank()],
    );

    let mut config = test_config(vec![scan], temp.path().join("graded"));
    config.options.split_oversized = true;
    config.options.infer_continuation = true;
    config.options.fast_decode_only = true;
    config.dry_run = true;

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.documents[0].page_count(), 4);
}

#[tokio::test]
async fn test_oversized_pages_are_copied_without_split_flag() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[a3("Erin_505", Side::Left), a3("Erin_505", Side::Right)],
    );

    let mut config = test_config(vec![scan], temp.path().join("graded"));
    config.options.fast_decode_only = true;
    config.dry_run = true;

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(
        report.documents[0].pages,
        vec![
            PageContent::Copy { source_index: 0 },
            PageContent::Copy { source_index: 1 },
        ]
    );
}

/// Two oversized pages of different students are never paired: each keeps
/// its own document with its page copied whole.
#[tokio::test]
async fn test_adjacent_oversized_pages_of_two_students_stay_separate() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[a3("Carol_303", Side::Left), a3("Dave_404", Side::Right)],
    );
    let output = temp.path().join("graded");

    let mut config = test_config(vec![scan], output.clone());
    config.options.split_oversized = true;
    config.options.fast_decode_only = true;

    let (observer, logger) = recording_observer();
    let report = split_exam(config, &observer, &CancelFlag::new()).await.unwrap();

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.documents[0].routing_key, "Carol_303");
    assert_eq!(report.documents[0].pages, vec![PageContent::Copy { source_index: 0 }]);
    assert_eq!(report.documents[1].routing_key, "Dave_404");
    assert_eq!(report.documents[1].pages, vec![PageContent::Copy { source_index: 1 }]);
    assert!(!logger.messages().iter().any(|(_, m)| m.contains("will be split")));

    let package = PackageWriter::new(&output, FolderNaming::default());
    assert_eq!(page_count(&package.student_path("Carol_303")), 1);
    assert_eq!(page_count(&package.student_path("Dave_404")), 1);
}

#[tokio::test]
async fn test_every_source_page_is_accounted_for() {
    let temp = TempDir::new().unwrap();
    let scan = write_scan(
        temp.path(),
        "scan.pdf",
        &[
            a4_blank(),
            a4("Alice_101"),
            a4_blank(),
            a4_blank(),
            a4("Bob_202"),
            a3("Erin_505", Side::Left),
            a4("Alice_101"),
        ],
    );

    let mut config = test_config(vec![scan], temp.path().join("graded"));
    config.options.infer_continuation = true;
    config.options.fast_decode_only = true;
    config.dry_run = true;

    let report = split_exam(config, &RunObserver::silent(), &CancelFlag::new())
        .await
        .unwrap();

    let assigned: usize = report.documents.iter().map(|d| d.page_count()).sum();
    assert_eq!(assigned + report.summary.unassigned.len(), 7);
    assert_eq!(report.summary.unassigned, vec![0, 3]);

    let mut seen: Vec<usize> = report
        .documents
        .iter()
        .flat_map(|d| d.pages.iter().map(|p| p.source_index()))
        .chain(report.summary.unassigned.iter().copied())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..7).collect::<Vec<_>>());
}
