//! PDF writing and saving operations.
//!
//! Files of the delivery package are written atomically: the content goes
//! to a temporary sibling file which is then renamed over the destination.
//! Serialization runs on the blocking thread pool.
//!
//! # Examples
//!
//! ```no_run
//! use examsplit::io::writer::PdfWriter;
//! use lopdf::Document;
//! use std::path::Path;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! writer.save(doc, Path::new("Alice_1001.pdf")).await?;
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{ExamSplitError, Result};
use crate::utils::format_file_size;

/// Buffer size of the file writer, in bytes.
const BUFFER_SIZE: usize = 64 * 1024;

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Writes documents compressed and atomically.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter;

impl PdfWriter {
    /// Create a writer.
    pub fn new() -> Self {
        Self
    }

    /// Save a PDF document to a file.
    pub async fn save(&self, doc: Document, path: &Path) -> Result<()> {
        self.save_with_stats(doc, path).await.map(|_| ())
    }

    /// Save a PDF and return statistics about the operation.
    ///
    /// # Errors
    ///
    /// Returns `FailedToCreateOutput` if the file cannot be created and
    /// `FailedToWrite` if serialization, flushing or the final rename fails.
    pub async fn save_with_stats(&self, mut doc: Document, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || {
            let start = Instant::now();
            doc.compress();

            write_atomically(&path_buf, |writer| {
                doc.save_to(writer).map(|_| ()).map_err(std::io::Error::other)
            })?;

            let file_size = std::fs::metadata(&path_buf).map(|m| m.len()).unwrap_or(0);

            Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size,
                output_path: path_buf,
            })
        })
        .await
        .map_err(|e| ExamSplitError::other(format!("Write task failed: {e}")))?
    }

    /// Write raw bytes (e.g. the JSON summary) with the same atomic strategy.
    pub async fn write_bytes(&self, bytes: Vec<u8>, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || {
            let start = Instant::now();

            write_atomically(&path_buf, |writer| writer.write_all(&bytes))?;

            Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size: bytes.len() as u64,
                output_path: path_buf,
            })
        })
        .await
        .map_err(|e| ExamSplitError::other(format!("Write task failed: {e}")))?
    }
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut std::io::BufWriter<std::fs::File>) -> std::io::Result<()>,
{
    let temp_path = temp_path_for(path);

    let file = std::fs::File::create(&temp_path).map_err(|e| ExamSplitError::FailedToCreateOutput {
        path: temp_path.clone(),
        source: e,
    })?;
    let mut writer = std::io::BufWriter::with_capacity(BUFFER_SIZE, file);

    if let Err(e) = write(&mut writer).and_then(|_| writer.flush()) {
        std::fs::remove_file(&temp_path).ok();
        return Err(ExamSplitError::FailedToWrite {
            path: temp_path,
            source: e,
        });
    }
    drop(writer);

    std::fs::rename(&temp_path, path).map_err(|e| ExamSplitError::FailedToWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `report.pdf` becomes `.report.pdf.tmp` in the same directory.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
