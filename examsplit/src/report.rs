//! Run summary: the overview table, the summary PDF and `summary.json`.
//!
//! The summary always states how many pages each student got and lists
//! every page that could not be assigned by its 1-indexed page number.

use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::error::{ExamSplitError, Result};
use crate::rebuild::compose::{PageAssembler, TextLine};
use crate::rebuild::{DocumentComposer, OutputDocument};
use crate::source::SourceDocument;

/// Name part of a routing key (up to the first `_`).
pub fn display_name(routing_key: &str) -> &str {
    routing_key.split('_').next().unwrap_or(routing_key)
}

/// Id part of a routing key (the second `_` segment), or the whole key.
pub fn student_id(routing_key: &str) -> &str {
    routing_key
        .split('_')
        .nth(1)
        .filter(|id| !id.is_empty())
        .unwrap_or(routing_key)
}

/// One student line of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// Name shown to people.
    pub display_name: String,
    /// Full routing key.
    pub routing_key: String,
    /// Pages in the student's document.
    pub page_count: usize,
}

/// A student whose document could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFailure {
    /// Full routing key.
    pub routing_key: String,
    /// Error message.
    pub reason: String,
}

/// Outcome of a run, per student.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Students with a document, in first-seen order.
    pub students: Vec<SummaryRow>,
    /// Zero-based indices of unassigned source pages.
    pub unassigned: Vec<usize>,
    /// Students whose document failed.
    pub failures: Vec<StudentFailure>,
    /// Pages in the source document.
    pub total_pages: usize,
}

impl Summary {
    /// Empty summary for a source of `total_pages` pages.
    pub fn new(total_pages: usize, unassigned: Vec<usize>) -> Self {
        Self {
            total_pages,
            unassigned,
            ..Default::default()
        }
    }

    /// Record a student's document.
    pub fn add_student(&mut self, routing_key: &str, page_count: usize) {
        self.students.push(SummaryRow {
            display_name: display_name(routing_key).to_string(),
            routing_key: routing_key.to_string(),
            page_count,
        });
    }

    /// Record a student whose document failed.
    pub fn add_failure(&mut self, routing_key: &str, reason: impl Into<String>) {
        self.failures.push(StudentFailure {
            routing_key: routing_key.to_string(),
            reason: reason.into(),
        });
    }

    /// Unassigned pages as 1-indexed page numbers.
    pub fn unassigned_display(&self) -> Vec<usize> {
        self.unassigned.iter().map(|i| i + 1).collect()
    }

    /// True if some pages were not assigned.
    pub fn is_degraded(&self) -> bool {
        !self.unassigned.is_empty()
    }

    /// The end-of-run warning for a degraded run.
    pub fn degraded_warning(&self) -> Option<String> {
        self.is_degraded().then(|| {
            format!(
                "{} page(s) could not be assigned to a student: {:?}. Please check the summary.",
                self.unassigned.len(),
                self.unassigned_display()
            )
        })
    }

    /// Lines of the overview page(s).
    pub fn overview_lines(&self) -> Vec<TextLine> {
        let mut lines = vec![
            TextLine::heading("Summary", 24.0),
            TextLine::blank(),
            TextLine::plain(format!("Students: {}", self.students.len())),
            TextLine::plain(format!("Pages scanned: {}", self.total_pages)),
            TextLine::blank(),
            TextLine::heading("Name | Pages", 11.0),
        ];

        lines.extend(
            self.students
                .iter()
                .map(|row| TextLine::plain(format!("{} | {}", row.display_name, row.page_count))),
        );
        lines.push(TextLine::blank());

        if self.is_degraded() {
            let pages: Vec<String> = self
                .unassigned_display()
                .iter()
                .map(ToString::to_string)
                .collect();
            lines.push(TextLine::heading(
                format!(
                    "Unassigned pages: {} page(s): {}",
                    self.unassigned.len(),
                    pages.join(", ")
                ),
                11.0,
            ));
        } else {
            lines.push(TextLine::plain("All pages assigned."));
        }

        if !self.failures.is_empty() {
            lines.push(TextLine::blank());
            lines.push(TextLine::heading("Documents that could not be created:", 11.0));
            lines.extend(
                self.failures
                    .iter()
                    .map(|f| TextLine::plain(format!("{}: {}", f.routing_key, f.reason))),
            );
        }

        lines
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| ExamSplitError::summary_failed(e.to_string()))
    }
}

/// Compose the summary PDF.
///
/// Layout: overview page(s); if pages are unassigned, a divider page and
/// copies of those pages; then, per student in `plans`, a name page followed
/// by the student's pages.
pub fn build_summary_pdf(
    summary: &Summary,
    source: &SourceDocument,
    plans: &[OutputDocument],
) -> Result<Document> {
    let mut assembler = PageAssembler::new(source);
    let wrap = |e: ExamSplitError| ExamSplitError::summary_failed(e.to_string());

    assembler.add_text_pages(&summary.overview_lines()).map_err(wrap)?;

    if summary.is_degraded() {
        assembler
            .add_text_pages(&[TextLine::heading("Unassigned pages", 32.0)])
            .map_err(wrap)?;
        for &index in &summary.unassigned {
            assembler.add_source_page(index, None).map_err(wrap)?;
        }
    }

    let composer = DocumentComposer::new(source);
    for plan in plans {
        assembler
            .add_text_pages(&[TextLine::heading(
                format!("Student: {}", display_name(&plan.routing_key)),
                32.0,
            )])
            .map_err(wrap)?;
        composer.append(&mut assembler, plan).map_err(wrap)?;
    }

    Ok(assembler.finish())
}
