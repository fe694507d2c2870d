//! PDF input and output.
//!
//! - [`reader`] loads scan files on the blocking pool
//! - [`writer`] saves documents and raw files atomically

pub mod reader;
pub mod writer;

pub use reader::{LoadResult, LoadStatistics, LoadedPdf, PdfReader};
pub use writer::{PdfWriter, WriteStatistics};
