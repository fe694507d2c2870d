//! Reconstruction of per-student documents.
//!
//! [`Reconstructor::reconstruct`] turns a student's pages into an
//! [`OutputDocument`] plan: which source pages are copied and which
//! oversized sheets are cut into halves. [`compose`] renders plans into
//! `lopdf` documents.

pub mod compose;

pub use compose::DocumentComposer;

use lopdf::Document;
use serde::Serialize;

use crate::config::HalfPageOrder;
use crate::error::Result;
use crate::output::RunObserver;
use crate::scan::{PageRecord, PageStatus, Placement, SizeClass, StudentGroup};
use crate::source::{HalfSide, SourceDocument};

/// One page of an output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PageContent {
    /// The source page unchanged.
    Copy {
        /// Source page index.
        source_index: usize,
    },
    /// One half of a source page.
    Half {
        /// Source page index.
        source_index: usize,
        /// Which half.
        side: HalfSide,
    },
}

impl PageContent {
    /// The source page this content comes from.
    pub fn source_index(&self) -> usize {
        match self {
            Self::Copy { source_index } | Self::Half { source_index, .. } => *source_index,
        }
    }
}

/// Page plan of one student's document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    /// The student's routing key.
    pub routing_key: String,
    /// Output pages in order.
    pub pages: Vec<PageContent>,
}

impl OutputDocument {
    /// Number of output pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Plans per-student documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconstructor {
    split_oversized: bool,
    order: HalfPageOrder,
}

impl Reconstructor {
    /// Reconstructor for the given split flag and half-page order.
    pub fn new(split_oversized: bool, order: HalfPageOrder) -> Self {
        Self {
            split_oversized,
            order,
        }
    }

    /// Plan the output document of one student.
    pub fn reconstruct(&self, group: &StudentGroup) -> OutputDocument {
        self.plan(group, &RunObserver::silent())
    }

    /// Plan the output document and log every split.
    pub fn plan(&self, group: &StudentGroup, observer: &RunObserver) -> OutputDocument {
        let records = &group.pages;
        let mut pages = Vec::with_capacity(records.len());
        let mut i = 0;

        while i < records.len() {
            let current = &records[i];

            if self.split_oversized
                && current.size_class == SizeClass::Oversized
                && let Some(next) = records.get(i + 1)
                && is_splittable_pair(current, next)
            {
                observer.info(&format!(
                    "Pages {} and {} will be split.",
                    current.page_index + 1,
                    next.page_index + 1
                ));
                pages.extend(self.halves(current.page_index, next.page_index));
                i += 2;
                continue;
            }

            pages.push(PageContent::Copy {
                source_index: current.page_index,
            });
            i += 1;
        }

        OutputDocument {
            routing_key: group.routing_key.clone(),
            pages,
        }
    }

    fn halves(&self, current: usize, next: usize) -> [PageContent; 4] {
        let half = |source_index, side| PageContent::Half { source_index, side };

        match self.order {
            HalfPageOrder::Interleaved => [
                half(current, HalfSide::Right),
                half(current, HalfSide::Left),
                half(next, HalfSide::Left),
                half(next, HalfSide::Right),
            ],
            HalfPageOrder::Booklet => [
                half(current, HalfSide::Right),
                half(next, HalfSide::Left),
                half(next, HalfSide::Right),
                half(current, HalfSide::Left),
            ],
        }
    }
}

/// Two consecutive oversized pages form one split pair when the first was
/// read on its left half and the second on its right half, or when the
/// second carries no placement of its own.
pub fn is_splittable_pair(current: &PageRecord, next: &PageRecord) -> bool {
    (current.status == PageStatus::Decoded
        && current.placement == Placement::Left
        && next.placement == Placement::Right)
        || next.placement == Placement::None
}

/// Plan and compose one student's document.
///
/// Returns the page count and the composed document.
pub fn reconstruct(
    group: &StudentGroup,
    source: &SourceDocument,
    split_oversized: bool,
) -> Result<(usize, Document)> {
    let plan = Reconstructor::new(split_oversized, HalfPageOrder::default()).reconstruct(group);
    let document = DocumentComposer::new(source).compose(&plan)?;
    Ok((plan.page_count(), document))
}
