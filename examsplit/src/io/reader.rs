//! PDF reading and loading operations.
//!
//! Scanned exam files are parsed on the blocking thread pool, several at a
//! time. Results always come back in input order, because that order decides
//! the page numbering of the merged source document.
//!
//! # Examples
//!
//! ```no_run
//! use examsplit::io::reader::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("room-a.pdf"), PathBuf::from("room-b.pdf")];
//! let (results, stats) = reader.load_all(&paths, 4).await;
//! println!("{} of {} files loaded", stats.success_count, results.len());
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{ExamSplitError, Result};

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to load the document.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Total time taken for all loads.
    pub total_time: Duration,

    /// Total size of successfully loaded files.
    pub total_size: u64,

    /// Total number of pages loaded.
    pub total_pages: usize,
}

impl LoadStatistics {
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut stats = Self {
            success_count: 0,
            failure_count: 0,
            total_time,
            total_size: 0,
            total_pages: 0,
        };

        for result in results {
            match result {
                Ok(loaded) => {
                    stats.success_count += 1;
                    stats.total_size += loaded.file_size;
                    stats.total_pages += loaded.page_count;
                }
                Err(_) => stats.failure_count += 1,
            }
        }

        stats
    }
}

/// Loads scan files; documents without pages are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReader;

impl PdfReader {
    /// Create a reader.
    pub fn new() -> Self {
        Self
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File does not exist or is not a regular file
    /// - File is not a valid PDF
    /// - PDF is encrypted
    /// - PDF has no pages
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || load_blocking(path_buf))
            .await
            .map_err(|e| ExamSplitError::other(format!("Load task failed: {e}")))?
    }

    /// Load multiple PDF documents one at a time, in order.
    pub async fn load_sequential(&self, paths: &[PathBuf]) -> Vec<LoadResult> {
        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            results.push(self.load(path).await);
        }

        results
    }

    /// Load multiple PDF documents concurrently.
    ///
    /// At most `workers` files are parsed at the same time. The returned
    /// vector has the same order as `paths`.
    pub async fn load_parallel(&self, paths: &[PathBuf], workers: usize) -> Vec<LoadResult> {
        use futures::stream::{self, StreamExt};

        let workers = workers.max(1);
        let reader = *self;

        let tasks = paths.iter().cloned().map(move |path| async move {
            reader.load(&path).await
        });

        stream::iter(tasks).buffered(workers).collect::<Vec<_>>().await
    }

    /// Load all PDFs, choosing sequential loading for small batches.
    ///
    /// Returns the per-file results in input order plus aggregate statistics.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        max_workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();

        let results = if paths.len() <= 2 || max_workers <= 1 {
            self.load_sequential(paths).await
        } else {
            self.load_parallel(paths, max_workers).await
        };

        let stats = LoadStatistics::from_results(&results, start.elapsed());

        (results, stats)
    }
}

fn load_blocking(path: PathBuf) -> Result<LoadedPdf> {
    let start = Instant::now();

    let metadata = std::fs::metadata(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExamSplitError::file_not_found(path.clone()),
        _ => ExamSplitError::FileNotAccessible {
            path: path.clone(),
            source: e,
        },
    })?;

    if !metadata.is_file() {
        return Err(ExamSplitError::not_a_file(path));
    }

    let bytes = std::fs::read(&path).map_err(|e| ExamSplitError::FileNotAccessible {
        path: path.clone(),
        source: e,
    })?;

    let document = Document::load_mem(&bytes).map_err(|e| {
        let err_msg = e.to_string();
        if err_msg.contains("encrypt") || err_msg.contains("password") {
            ExamSplitError::encrypted_pdf(path.clone())
        } else {
            ExamSplitError::failed_to_load_pdf(path.clone(), err_msg)
        }
    })?;

    if document.is_encrypted() {
        return Err(ExamSplitError::encrypted_pdf(path));
    }

    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(ExamSplitError::corrupted_pdf(path, "PDF has no pages"));
    }

    tracing::debug!(path = %path.display(), pages = page_count, "loaded input");

    Ok(LoadedPdf {
        document,
        path,
        page_count,
        load_time: start.elapsed(),
        file_size: metadata.len(),
    })
}
