//! Configuration module for examsplit.
//!
//! This module holds the validated, normalized settings that drive a run:
//! - The three core scan flags ([`ScanOptions`])
//! - Input and output locations
//! - Output naming of the delivery package
//! - Verbosity, overwrite behavior and parallelism

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default rasterization zoom (device pixels per PDF unit).
pub const DEFAULT_ZOOM: f32 = 3.0;

/// Upper bound for the rasterization zoom.
pub const MAX_ZOOM: f32 = 8.0;

/// The flags that change how pages are decoded, assigned and rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    /// Bisect oversized (A3) sheets into two standard pages when they pair up.
    pub split_oversized: bool,

    /// Assign a page without QR code to the key of the page before it.
    pub infer_continuation: bool,

    /// Only try the unrotated image when decoding.
    pub fast_decode_only: bool,
}

/// Order of the four half pages produced by splitting a pair of oversized sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HalfPageOrder {
    /// current-right, current-left, next-left, next-right.
    #[default]
    Interleaved,
    /// current-right, next-left, next-right, current-left (folded sheet reading order).
    Booklet,
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if the output exists.
    NoClobber,
}

/// Naming of the per-student folders in the delivery package.
///
/// A folder is named `<prefix>_<studentId>_<suffix>`, the layout expected by
/// the learning platform's bulk feedback upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNaming {
    /// Leading part of the folder name.
    pub prefix: String,
    /// Trailing part of the folder name.
    pub suffix: String,
}

impl Default for FolderNaming {
    fn default() -> Self {
        Self {
            prefix: "Participant".to_string(),
            suffix: "assignsubmission_file_".to_string(),
        }
    }
}

impl FolderNaming {
    /// Folder name for a student id.
    pub fn folder_name(&self, student_id: &str) -> String {
        format!("{}_{}_{}", self.prefix, student_id, self.suffix)
    }
}

/// Complete configuration for a split run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input PDF file paths (concatenated in this order).
    pub inputs: Vec<PathBuf>,

    /// Output package directory.
    pub output: PathBuf,

    /// Dry run mode - scan and plan without writing the package.
    pub dry_run: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Output overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Skip inputs that fail to load instead of stopping.
    pub continue_on_error: bool,

    /// Number of parallel jobs (None = auto-detect).
    pub jobs: Option<usize>,

    /// Core scan flags.
    pub options: ScanOptions,

    /// Order of half pages for split oversized sheets.
    pub half_page_order: HalfPageOrder,

    /// Folder naming of the delivery package.
    pub naming: FolderNaming,

    /// Rasterization zoom used for QR decoding.
    pub zoom: f32,

    /// Write `summary.json` next to `summary.pdf`.
    pub write_json: bool,
}

impl Config {
    /// Create a configuration with defaults for everything but the paths.
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self {
            inputs,
            output,
            dry_run: false,
            verbose: false,
            quiet: false,
            overwrite_mode: OverwriteMode::Prompt,
            continue_on_error: false,
            jobs: None,
            options: ScanOptions::default(),
            half_page_order: HalfPageOrder::default(),
            naming: FolderNaming::default(),
            zoom: DEFAULT_ZOOM,
            write_json: true,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input files are specified
    /// - Verbose and quiet modes are both enabled
    /// - Jobs count is zero
    /// - The zoom factor is not in `(0, 8]`
    /// - The output directory is also an input
    /// - The folder prefix is empty
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            bail!("No input files specified");
        }

        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            bail!("Number of jobs must be at least 1");
        }

        if !(self.zoom > 0.0 && self.zoom <= MAX_ZOOM) {
            bail!("Zoom must be greater than 0 and at most {MAX_ZOOM}, got {}", self.zoom);
        }

        for input in &self.inputs {
            if input == &self.output {
                bail!(
                    "Output directory cannot be the same as an input file: {}",
                    self.output.display()
                );
            }
        }

        if self.naming.prefix.trim().is_empty() {
            bail!("Folder prefix must not be empty");
        }

        Ok(())
    }

    /// Get the effective number of parallel jobs.
    ///
    /// Returns the configured job count, or the number of CPU cores if auto-detect.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Check if output should be displayed.
    ///
    /// Returns false if in quiet mode and not doing a dry run.
    pub fn should_print(&self) -> bool {
        !self.quiet || self.dry_run
    }
}
