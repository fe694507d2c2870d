//! Concatenation of the uploaded scan files.
//!
//! All inputs are loaded in parallel and appended in argument order to the
//! page tree of the first one. The result is the single source document the
//! scan works on; page numbers in every message refer to it.

use lopdf::{Document, Object, ObjectId};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{ExamSplitError, Result};
use crate::io::{LoadedPdf, PdfReader};
use crate::output::RunObserver;
use crate::source::{INHERITABLE_KEYS, inherited_attribute};
use crate::utils::format_file_size;

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Number of files merged.
    pub files_merged: usize,

    /// Number of inputs skipped because they failed to load.
    pub files_skipped: usize,

    /// Total number of pages in merged document.
    pub total_pages: usize,

    /// Total time taken for the merge, loading included.
    pub merge_time: Duration,

    /// Time taken to load all PDFs.
    pub load_time: Duration,

    /// Total size of input files.
    pub input_size: u64,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }
}

/// Result of a merge operation.
#[derive(Debug)]
pub struct MergeResult {
    /// The merged document.
    pub document: Document,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,

    /// Paths of files that were merged.
    pub merged_files: Vec<PathBuf>,
}

/// Loads and concatenates scan files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Merger {
    reader: PdfReader,
}

impl Merger {
    /// Create a new merger with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `inputs` with up to `jobs` workers and concatenate them.
    ///
    /// # Errors
    ///
    /// The first load error, unless `continue_on_error` is set; then failing
    /// inputs are skipped with a warning and [`ExamSplitError::NoInputFiles`]
    /// is returned only if nothing loads.
    pub async fn merge(
        &self,
        inputs: &[PathBuf],
        jobs: usize,
        continue_on_error: bool,
        observer: &RunObserver,
    ) -> Result<MergeResult> {
        let merge_start = Instant::now();

        let (load_results, load_stats) = self.reader.load_all(inputs, jobs).await;

        let mut loaded = Vec::with_capacity(load_results.len());
        for result in load_results {
            match result {
                Ok(pdf) => loaded.push(pdf),
                Err(e) if continue_on_error => {
                    observer.warning(&format!("Skipping file due to error: {e}"));
                }
                Err(e) => return Err(e),
            }
        }

        if loaded.is_empty() {
            return Err(ExamSplitError::NoInputFiles);
        }

        let files_merged = loaded.len();
        let input_size = loaded.iter().map(|p| p.file_size).sum();
        let merged_files = loaded.iter().map(|p| p.path.clone()).collect();

        let document = merge_documents(loaded)?;

        let statistics = MergeStatistics {
            files_merged,
            files_skipped: load_stats.failure_count,
            total_pages: document.get_pages().len(),
            merge_time: merge_start.elapsed(),
            load_time: load_stats.total_time,
            input_size,
        };

        Ok(MergeResult {
            document,
            statistics,
            merged_files,
        })
    }
}

/// Append the pages of every further document to the first one.
pub fn merge_documents(loaded: Vec<LoadedPdf>) -> Result<Document> {
    let mut documents = loaded.into_iter().map(|pdf| pdf.document);
    let mut merged = documents.next().ok_or(ExamSplitError::NoInputFiles)?;

    for mut doc in documents {
        doc.renumber_objects_with(merged.max_id + 1);

        // Materialize inherited attributes: the appended pages lose their
        // own page tree.
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &page_ids {
            let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
                .iter()
                .filter_map(|key| {
                    inherited_attribute(&doc, page_id, key).map(|value| (*key, value.clone()))
                })
                .collect();

            if let Ok(page) = doc.get_dictionary_mut(page_id) {
                for (key, value) in inherited {
                    if !page.has(key) {
                        page.set(key, value);
                    }
                }
            }
        }

        merged.max_id = merged.max_id.max(doc.max_id);
        merged.objects.extend(doc.objects);
        add_pages_to_tree(&mut merged, &page_ids)?;
    }

    Ok(merged)
}

/// Add pages to the root node of the merged page tree.
fn add_pages_to_tree(merged: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = merged
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| ExamSplitError::merge_failed(format!("Failed to get pages reference: {e}")))?;

    for &page_id in page_ids {
        if let Ok(page) = merged.get_dictionary_mut(page_id) {
            page.set("Parent", pages_id);
        }
    }

    let pages = merged
        .get_dictionary_mut(pages_id)
        .map_err(|e| ExamSplitError::merge_failed(format!("Failed to get pages object: {e}")))?;

    match pages.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => kids.extend(page_ids.iter().map(|id| Object::Reference(*id))),
        Ok(_) => return Err(ExamSplitError::merge_failed("Kids is not an array")),
        Err(_) => return Err(ExamSplitError::merge_failed("Pages dictionary missing Kids array")),
    }

    let current_count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    pages.set("Count", Object::Integer(current_count + page_ids.len() as i64));

    Ok(())
}
