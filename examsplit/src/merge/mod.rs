//! Loading and concatenating the uploaded scan files.

pub mod merger;

pub use merger::{MergeResult, MergeStatistics, Merger, merge_documents};
