//! The delivery package on disk.
//!
//! ```text
//! <root>/summary.pdf
//! <root>/summary.json
//! <root>/<prefix>_<studentId>_<suffix>/<routingKey>.pdf
//! ```
//!
//! Folder and file names are sanitized; all files are written atomically.

use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::FolderNaming;
use crate::error::{ExamSplitError, Result};
use crate::io::PdfWriter;
use crate::report::student_id;
use crate::utils::sanitize_file_component;

/// File name of the summary PDF.
pub const SUMMARY_PDF: &str = "summary.pdf";
/// File name of the summary JSON.
pub const SUMMARY_JSON: &str = "summary.json";

/// Writes the package below one root directory.
#[derive(Debug, Clone)]
pub struct PackageWriter {
    root: PathBuf,
    naming: FolderNaming,
    writer: PdfWriter,
}

impl PackageWriter {
    /// Writer for the package at `root`.
    pub fn new(root: impl Into<PathBuf>, naming: FolderNaming) -> Self {
        Self {
            root: root.into(),
            naming,
            writer: PdfWriter::new(),
        }
    }

    /// The package root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the summary PDF.
    pub fn summary_pdf_path(&self) -> PathBuf {
        self.root.join(SUMMARY_PDF)
    }

    /// Path of the summary JSON.
    pub fn summary_json_path(&self) -> PathBuf {
        self.root.join(SUMMARY_JSON)
    }

    /// Folder of a student.
    pub fn student_dir(&self, routing_key: &str) -> PathBuf {
        let folder = self.naming.folder_name(student_id(routing_key));
        self.root.join(sanitize_file_component(&folder))
    }

    /// Path of a student's PDF.
    pub fn student_path(&self, routing_key: &str) -> PathBuf {
        let file = format!("{}.pdf", sanitize_file_component(routing_key));
        self.student_dir(routing_key).join(file)
    }

    /// Create the root directory.
    pub async fn prepare(&self) -> Result<()> {
        create_dir(&self.root).await
    }

    /// Write one student's document.
    pub async fn write_student(&self, routing_key: &str, document: Document) -> Result<PathBuf> {
        create_dir(&self.student_dir(routing_key)).await?;

        let path = self.student_path(routing_key);
        let stats = self.writer.save_with_stats(document, &path).await?;
        debug!(path = %path.display(), size = %stats.format_file_size(), "student document written");
        Ok(path)
    }

    /// Write the summary PDF and, if given, the summary JSON.
    pub async fn write_summary(&self, document: Document, json: Option<Vec<u8>>) -> Result<()> {
        self.writer.save(document, &self.summary_pdf_path()).await?;

        if let Some(json) = json {
            self.writer.write_bytes(json, &self.summary_json_path()).await?;
        }

        Ok(())
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| ExamSplitError::FailedToCreateOutput {
            path: path.to_path_buf(),
            source: e,
        })
}
