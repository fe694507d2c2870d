//! examsplit - Split merged exam scans into one PDF per student.
//!
//! Every exam sheet carries a QR code with the student's routing key
//! (`<name>_<id>`). This library reads those codes from a scanned stack,
//! assigns every page to a student and rebuilds one document per student,
//! including pages without a code of their own and oversized sheets that
//! hold two pages side by side. It supports:
//!
//! - Rotation-tolerant QR decoding of scanned page images
//! - Inference of continuation pages without a code
//! - Splitting of A3 sheets into their A4 halves
//! - A summary PDF and JSON that list every unassigned page
//! - Parallel loading and decoding with cooperative cancellation
//!
//! # Examples
//!
//! ## Full run
//!
//! ```no_run
//! use examsplit::config::Config;
//! use examsplit::output::RunObserver;
//! use examsplit::scan::CancelFlag;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::new(vec![PathBuf::from("scan.pdf")], PathBuf::from("graded"));
//! config.options.infer_continuation = true;
//!
//! let report = examsplit::split_exam(config, &RunObserver::silent(), &CancelFlag::new()).await?;
//! println!("{} students, {} unassigned pages",
//!          report.summary.students.len(),
//!          report.summary.unassigned.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Using individual components
//!
//! ```no_run
//! use examsplit::config::ScanOptions;
//! use examsplit::io::PdfReader;
//! use examsplit::output::RunObserver;
//! use examsplit::scan::{CancelFlag, PageScanner, group};
//! use examsplit::source::SourceDocument;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loaded = PdfReader::new().load(Path::new("scan.pdf")).await?;
//! let source = Arc::new(SourceDocument::new(loaded.document));
//!
//! let options = ScanOptions::default();
//! let scanner = PageScanner::new(&options, 3.0, 4);
//! let assignment = scanner
//!     .scan_and_assign(source, &options, &RunObserver::silent(), &CancelFlag::new())
//!     .await?;
//!
//! for student in group(&assignment.records) {
//!     println!("{}: {} page(s)", student.routing_key, student.pages.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod raster;
pub mod rebuild;
pub mod report;
pub mod scan;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ScanOptions};
pub use error::{ExamSplitError, Result};
pub use pipeline::{ExamSplitter, RunReport, split_exam};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
