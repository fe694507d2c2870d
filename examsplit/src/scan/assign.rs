//! Page-to-student assignment.
//!
//! The walk over the decode results is strictly sequential: whether a page
//! without a code can be attributed depends on the page before it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PageScan;
use super::classify::SizeClass;
use super::decode::Placement;
use crate::config::ScanOptions;
use crate::output::RunObserver;

/// Roster-label artifact removed from decoded payloads.
pub const ROSTER_LABEL_ARTIFACT: &str = "Teilnehmer/in";

/// How a page got its routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageStatus {
    /// The page's own code was read.
    Decoded,
    /// No code; attributed to the key of the page before.
    InferredFromPrevious,
    /// No code and no attribution.
    Unassigned,
}

/// Assignment result for one source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Zero-based position in the source document.
    pub page_index: usize,
    /// Physical size class.
    pub size_class: SizeClass,
    /// Assignment status.
    pub status: PageStatus,
    /// Student the page belongs to, `None` only when unassigned.
    pub routing_key: Option<String>,
    /// Code position, only meaningful when decoded.
    pub placement: Placement,
    /// Rotation at which the code was read.
    pub angle: Option<i32>,
}

impl PageRecord {
    /// True if the page belongs to a student.
    pub fn is_assigned(&self) -> bool {
        self.status != PageStatus::Unassigned
    }
}

/// Carry-over state of the assignment walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    /// No key available for inference.
    #[default]
    NoPriorKey,
    /// Key of the last decoded page, not yet used for inference.
    HasPriorKey(String),
}

/// Records for every page plus the pages nobody could claim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// One record per page, in source order.
    pub records: Vec<PageRecord>,
    /// Zero-based indices of unassigned pages, ascending.
    pub unassigned: Vec<usize>,
}

impl Assignment {
    /// True if every page was assigned.
    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }

    /// Unassigned pages as 1-indexed page numbers.
    pub fn unassigned_display(&self) -> Vec<usize> {
        self.unassigned.iter().map(|i| i + 1).collect()
    }
}

/// Remove the roster artifact from a decoded payload.
pub fn routing_key_from_payload(payload: &str) -> String {
    payload.replace(ROSTER_LABEL_ARTIFACT, "")
}

/// Assign every scanned page to a student.
///
/// `scans` must be in source page order.
pub fn assign(scans: &[PageScan], options: &ScanOptions, observer: &RunObserver) -> Assignment {
    let mut state = RunState::NoPriorKey;
    let mut records = Vec::with_capacity(scans.len());
    let mut unassigned = Vec::new();

    for scan in scans {
        let page_number = scan.page_index + 1;

        if let Some(reason) = &scan.raster_error {
            observer.warning(&format!("Page {page_number} could not be rasterized: {reason}"));
        }

        let record = match &scan.outcome.payload {
            Some(payload) => {
                let name = payload.split('_').next().unwrap_or(payload);
                let angle = scan.outcome.angle.unwrap_or(0);
                if angle == 0 {
                    observer.info(&format!("QR code on page {page_number} read. Student: {name}"));
                } else {
                    observer.info(&format!(
                        "QR code on page {page_number} read. Student: {name} (angle {angle})"
                    ));
                }

                let key = routing_key_from_payload(payload);
                state = RunState::HasPriorKey(key.clone());
                PageRecord {
                    page_index: scan.page_index,
                    size_class: scan.size_class,
                    status: PageStatus::Decoded,
                    routing_key: Some(key),
                    placement: scan.outcome.placement,
                    angle: scan.outcome.angle,
                }
            }
            None => match (&state, options.infer_continuation) {
                (RunState::HasPriorKey(key), true) => {
                    observer.info(&format!(
                        "No QR code on page {page_number}. Inferred from previous page."
                    ));
                    let key = key.clone();
                    state = RunState::NoPriorKey;
                    PageRecord {
                        page_index: scan.page_index,
                        size_class: scan.size_class,
                        status: PageStatus::InferredFromPrevious,
                        routing_key: Some(key),
                        placement: Placement::None,
                        angle: None,
                    }
                }
                (_, infer) => {
                    if infer {
                        observer.error(&format!(
                            "No QR code on page {page_number} and none on the page before. Page could not be assigned."
                        ));
                    } else {
                        observer.error(&format!(
                            "No QR code on page {page_number}. Page could not be assigned."
                        ));
                    }
                    unassigned.push(scan.page_index);
                    PageRecord {
                        page_index: scan.page_index,
                        size_class: scan.size_class,
                        status: PageStatus::Unassigned,
                        routing_key: None,
                        placement: Placement::None,
                        angle: None,
                    }
                }
            },
        };

        debug!(page = page_number, status = ?record.status, key = ?record.routing_key, "page assigned");
        records.push(record);
    }

    let assignment = Assignment { records, unassigned };

    if assignment.is_complete() {
        observer.info("All QR codes read.");
    } else {
        let pages: Vec<String> = assignment
            .unassigned_display()
            .iter()
            .map(ToString::to_string)
            .collect();
        observer.error(&format!("QR codes on pages {} could not be read.", pages.join(", ")));
    }

    assignment
}
