//! Error types for examsplit.
//!
//! Every fallible operation in the library returns [`ExamSplitError`]. The
//! variants carry enough context (paths, page numbers, routing keys) for the
//! command-line front end to print an actionable message and pick an exit code.
//!
//! A page that fails to render ([`ExamSplitError::RenderFailed`]) never
//! ends a run; the scan treats it as having no readable code.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for examsplit operations.
pub type Result<T> = std::result::Result<T, ExamSplitError>;

/// Main error type for examsplit operations.
#[derive(Debug, Error)]
pub enum ExamSplitError {
    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input file is not accessible (permission denied, etc.).
    #[error("Cannot access file: {}\n  Reason: {source}", .path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Input path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// Failed to load PDF file.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", .path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// PDF file is corrupted or has invalid structure.
    #[error("Corrupted or invalid PDF: {}\n  Details: {details}", .path.display())]
    CorruptedPdf {
        /// Path to the corrupted PDF.
        path: PathBuf,
        /// Details about the corruption.
        details: String,
    },

    /// PDF file is encrypted and cannot be processed.
    #[error(
        "PDF is encrypted and cannot be processed: {}\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools",
        .path.display()
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// No usable input files remained.
    #[error("No input files to process")]
    NoInputFiles,

    /// Output path already exists and overwrite is not allowed.
    #[error(
        "Output already exists: {}\n  \
         Use --force to overwrite or choose a different output directory",
        .path.display()
    )]
    OutputExists {
        /// Path to the existing output.
        path: PathBuf,
    },

    /// Failed to create an output file or directory.
    #[error("Failed to create output: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write to an output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Concatenating the input documents failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// A page index outside the source document was requested.
    #[error("Page {index} is out of range (document has {total} page(s))")]
    PageOutOfRange {
        /// Zero-based page index that was requested.
        index: usize,
        /// Number of pages in the document.
        total: usize,
    },

    /// The page could not be rendered for QR decoding.
    #[error("Cannot render page {}: {reason}", .page + 1)]
    RenderFailed {
        /// Zero-based page index.
        page: usize,
        /// Details about the failure.
        reason: String,
    },

    /// Building the document of one student failed.
    #[error("Failed to build document for '{routing_key}': {reason}")]
    ReconstructionFailed {
        /// Routing key of the affected student.
        routing_key: String,
        /// Details about the failure.
        reason: String,
    },

    /// Building the summary document failed.
    #[error("Failed to build summary: {reason}")]
    SummaryFailed {
        /// Details about the failure.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// The run was cancelled.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for ExamSplitError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<anyhow::Error> for ExamSplitError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl ExamSplitError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: PathBuf) -> Self {
        Self::NotAFile { path }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path,
            reason: reason.into(),
        }
    }

    /// Create a CorruptedPdf error.
    pub fn corrupted_pdf(path: PathBuf, details: impl Into<String>) -> Self {
        Self::CorruptedPdf {
            path,
            details: details.into(),
        }
    }

    /// Create an EncryptedPdf error.
    pub fn encrypted_pdf(path: PathBuf) -> Self {
        Self::EncryptedPdf { path }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create a RenderFailed error.
    pub fn render_failed(page: usize, reason: impl Into<String>) -> Self {
        Self::RenderFailed {
            page,
            reason: reason.into(),
        }
    }

    /// Create a ReconstructionFailed error.
    pub fn reconstruction_failed(routing_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReconstructionFailed {
            routing_key: routing_key.into(),
            reason: reason.into(),
        }
    }

    /// Create a SummaryFailed error.
    pub fn summary_failed(reason: impl Into<String>) -> Self {
        Self::SummaryFailed {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the run can continue).
    ///
    /// Load failures are recoverable in continue-on-error mode, page raster
    /// failures degrade to an undecoded page, and reconstruction failures only
    /// affect one student.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FailedToLoadPdf { .. }
                | Self::CorruptedPdf { .. }
                | Self::EncryptedPdf { .. }
                | Self::RenderFailed { .. }
                | Self::ReconstructionFailed { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } => 2,
            Self::FileNotAccessible { .. } => 2,
            Self::NotAFile { .. } => 2,
            Self::FailedToLoadPdf { .. } => 3,
            Self::CorruptedPdf { .. } => 3,
            Self::EncryptedPdf { .. } => 3,
            Self::NoInputFiles => 1,
            Self::OutputExists { .. } => 4,
            Self::FailedToCreateOutput { .. } => 5,
            Self::FailedToWrite { .. } => 5,
            Self::MergeFailed { .. } => 6,
            Self::PageOutOfRange { .. } => 6,
            Self::RenderFailed { .. } => 6,
            Self::ReconstructionFailed { .. } => 6,
            Self::SummaryFailed { .. } => 6,
            Self::InvalidConfig { .. } => 1,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Io { .. } => 5,
            Self::Other { .. } => 1,
        }
    }
}
