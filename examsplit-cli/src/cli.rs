//! CLI argument parsing for examsplit.
//!
//! Defines the command-line interface with `clap` and turns it into a
//! validated [`Config`].

use clap::Parser;
use std::path::PathBuf;

use examsplit::config::{
    Config, DEFAULT_ZOOM, FolderNaming, HalfPageOrder, OverwriteMode, ScanOptions,
};
use examsplit::error::{ExamSplitError, Result};
use examsplit::utils::resolve_inputs;

/// Split merged exam scans into one PDF per student.
///
/// Every exam sheet carries a QR code with the student's routing key. examsplit
/// reads the codes, assigns every page to a student and writes a package with
/// one folder per student plus a summary of pages that could not be assigned.
#[derive(Parser, Debug)]
#[command(name = "examsplit")]
#[command(version)]
#[command(about = "Split merged exam scans into one PDF per student", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Scanned PDF files, directories or glob patterns (in order)
    ///
    /// Directories are searched recursively for PDF files, sorted by path.
    /// All inputs are concatenated into one scan before reading codes;
    /// page numbers in messages refer to that combined scan.
    ///
    /// Examples:
    ///   examsplit scan.pdf -o graded
    ///   examsplit "scans/room-*.pdf" -o graded
    #[arg(required = true, value_name = "FILE|DIR|GLOB")]
    pub inputs: Vec<PathBuf>,

    /// Output directory of the package
    ///
    /// Receives summary.pdf, summary.json and one folder per student.
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Split A3 sheets into their two A4 halves
    ///
    /// Two consecutive A3 pages of the same student are cut at the
    /// midline and re-ordered into four A4 pages.
    #[arg(long)]
    pub split_a3: bool,

    /// Pages without a QR code continue the previous page
    ///
    /// Use when only every second page carries a code, e.g. for
    /// single-sided code printing on double-sided scans.
    #[arg(long)]
    pub two_page_scan: bool,

    /// Only try the unrotated page image when decoding
    ///
    /// Faster, but codes on skewed scans may not be found.
    #[arg(long)]
    pub fast: bool,

    /// Order split halves like a folded booklet
    ///
    /// right, next-left, next-right, left instead of
    /// right, left, next-left, next-right.
    #[arg(long, requires = "split_a3")]
    pub booklet_order: bool,

    /// Dry run - read codes and report without writing the package
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output - show every page decision and run statistics
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    ///
    /// Only errors and warnings will be printed.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing package without confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite an existing package
    ///
    /// If the output already holds a summary.pdf, exit with an error
    /// instead of prompting or overwriting.
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Skip input files that fail to load instead of aborting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Number of parallel jobs for loading and decoding
    ///
    /// Default is number of CPU cores. Use 1 for sequential processing.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Rasterization zoom for QR decoding (pixels per PDF point)
    #[arg(long, value_name = "F", default_value_t = DEFAULT_ZOOM)]
    pub zoom: f32,

    /// Leading part of the student folder names
    #[arg(long, value_name = "TEXT", env = "EXAMSPLIT_FOLDER_PREFIX")]
    pub prefix: Option<String>,

    /// Trailing part of the student folder names
    #[arg(long, value_name = "TEXT", env = "EXAMSPLIT_FOLDER_SUFFIX")]
    pub suffix: Option<String>,

    /// Do not write summary.json
    #[arg(long)]
    pub no_json: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// `inputs` replaces the raw input arguments; pass the result of
    /// [`Cli::resolve_inputs`].
    ///
    /// # Errors
    ///
    /// Returns [`ExamSplitError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn to_config(&self, inputs: Vec<PathBuf>) -> Result<Config> {
        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let defaults = FolderNaming::default();
        let naming = FolderNaming {
            prefix: self.prefix.clone().unwrap_or(defaults.prefix),
            suffix: self.suffix.clone().unwrap_or(defaults.suffix),
        };

        let config = Config {
            inputs,
            output: self.output.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            overwrite_mode,
            continue_on_error: self.continue_on_error,
            jobs: self.jobs,
            options: ScanOptions {
                split_oversized: self.split_a3,
                infer_continuation: self.two_page_scan,
                fast_decode_only: self.fast,
            },
            half_page_order: if self.booklet_order {
                HalfPageOrder::Booklet
            } else {
                HalfPageOrder::Interleaved
            },
            naming,
            zoom: self.zoom,
            write_json: !self.no_json,
        };

        config.validate().map_err(|e| {
            ExamSplitError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }

    /// Validate CLI arguments before touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty input list, zero jobs or a zoom
    /// outside `(0, 8]`.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(ExamSplitError::invalid_config("No input files specified"));
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err(ExamSplitError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }

        if !(self.zoom > 0.0 && self.zoom <= examsplit::config::MAX_ZOOM) {
            return Err(ExamSplitError::invalid_config(format!(
                "Invalid zoom: {}",
                self.zoom
            )));
        }

        Ok(())
    }

    /// Expand directories and glob patterns into the ordered list of scans.
    ///
    /// # Errors
    ///
    /// Returns an error for an input that matches nothing, or
    /// [`ExamSplitError::NoInputFiles`] if the expansion is empty.
    pub fn resolve_inputs(&self) -> Result<Vec<PathBuf>> {
        let inputs = resolve_inputs(&self.inputs)?;
        if inputs.is_empty() {
            return Err(ExamSplitError::NoInputFiles);
        }
        Ok(inputs)
    }
}
