//! End-to-end split run.
//!
//! Inputs are merged into one source document, every page is decoded and
//! assigned, each student's document is rebuilt and the delivery package is
//! written. A failure while building one student's document is reported in
//! the summary and does not affect the others.
//!
//! Every document is composed in memory before anything touches the output
//! directory, so a cancelled run leaves no files behind.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{info, instrument};

use crate::config::{Config, OverwriteMode};
use crate::error::{ExamSplitError, Result};
use crate::merge::{MergeStatistics, Merger};
use crate::output::RunObserver;
use crate::package::PackageWriter;
use crate::rebuild::{DocumentComposer, OutputDocument, Reconstructor};
use crate::report::{Summary, build_summary_pdf};
use crate::scan::{AngleSequence, Assignment, CancelFlag, PageScanner, QrDecoder, group};
use crate::source::SourceDocument;

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Per-student page counts, failures and unassigned pages.
    pub summary: Summary,
    /// Assignment of every source page.
    pub assignment: Assignment,
    /// Plans of the documents that were built.
    pub documents: Vec<OutputDocument>,
    /// Files written; empty for a dry run.
    pub written: Vec<PathBuf>,
    /// Statistics of the input merge.
    pub merge: MergeStatistics,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Runs the whole split for one configuration.
#[derive(Debug, Clone)]
pub struct ExamSplitter {
    config: Config,
    decoder: QrDecoder,
}

impl ExamSplitter {
    /// Splitter with the `rqrr` detector.
    pub fn new(config: Config) -> Self {
        let angles = AngleSequence::for_fast_mode(config.options.fast_decode_only);
        Self {
            config,
            decoder: QrDecoder::new(angles),
        }
    }

    /// Replace the decoder.
    pub fn with_decoder(mut self, decoder: QrDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// Configuration, load and merge errors, output errors, and
    /// [`ExamSplitError::Cancelled`]. Unassigned pages are not an error.
    #[instrument(skip_all, fields(inputs = self.config.inputs.len(), dry_run = self.config.dry_run))]
    pub async fn run(&self, observer: &RunObserver, cancel: &CancelFlag) -> Result<RunReport> {
        let start = Instant::now();
        let config = &self.config;

        config
            .validate()
            .map_err(|e| ExamSplitError::invalid_config(e.to_string()))?;

        let package = PackageWriter::new(&config.output, config.naming.clone());
        if config.overwrite_mode == OverwriteMode::NoClobber && package.summary_pdf_path().exists() {
            return Err(ExamSplitError::output_exists(package.summary_pdf_path()));
        }

        let jobs = config.effective_jobs();
        observer.info(&format!("Loading {} file(s)...", config.inputs.len()));
        let merged = Merger::new()
            .merge(&config.inputs, jobs, config.continue_on_error, observer)
            .await?;
        cancel.check()?;

        let source = Arc::new(SourceDocument::new(merged.document));
        let total_pages = source.page_count();
        observer.info(&format!("Reading QR codes on {total_pages} page(s)..."));

        let scanner = PageScanner::with_decoder(self.decoder.clone(), config.zoom, jobs);
        let scans = scanner.scan(Arc::clone(&source), observer, cancel).await?;
        let assignment = crate::scan::assign(&scans, &config.options, observer);

        let reconstructor = Reconstructor::new(config.options.split_oversized, config.half_page_order);
        let plans: Vec<OutputDocument> = group(&assignment.records)
            .iter()
            .map(|student| reconstructor.plan(student, observer))
            .collect();

        let mut summary = Summary::new(total_pages, assignment.unassigned.clone());
        let mut documents = Vec::with_capacity(plans.len());
        let mut composed = Vec::with_capacity(plans.len());
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();

        for plan in plans {
            cancel.check()?;

            let path = package.student_path(&plan.routing_key);
            if let Some(owner) = claimed.get(&path) {
                let reason = format!(
                    "output file {} is already used by {owner}",
                    path.display()
                );
                observer.error(&format!(
                    "Could not create the document for {}: {reason}",
                    plan.routing_key
                ));
                summary.add_failure(&plan.routing_key, reason);
                continue;
            }

            let result = {
                let source = Arc::clone(&source);
                let plan = plan.clone();
                task::spawn_blocking(move || DocumentComposer::new(&source).compose(&plan))
                    .await
                    .map_err(|e| ExamSplitError::other(format!("Compose task failed: {e}")))?
            };

            match result {
                Ok(document) => {
                    claimed.insert(path, plan.routing_key.clone());
                    summary.add_student(&plan.routing_key, plan.page_count());
                    composed.push((plan.routing_key.clone(), document));
                    documents.push(plan);
                }
                Err(e) => {
                    observer.error(&format!(
                        "Could not create the document for {}: {e}",
                        plan.routing_key
                    ));
                    summary.add_failure(&plan.routing_key, e.to_string());
                }
            }
        }

        let summary_pdf = {
            let source = Arc::clone(&source);
            let summary = summary.clone();
            let documents = documents.clone();
            task::spawn_blocking(move || build_summary_pdf(&summary, &source, &documents))
                .await
                .map_err(|e| ExamSplitError::other(format!("Summary task failed: {e}")))??
        };

        // Last point a cancel is honored; past it the package is written in full.
        cancel.check()?;

        let mut written = Vec::new();
        if !config.dry_run {
            package.prepare().await?;
            for (routing_key, document) in composed {
                written.push(package.write_student(&routing_key, document).await?);
            }

            let json = if config.write_json {
                Some(summary.to_json()?)
            } else {
                None
            };
            package.write_summary(summary_pdf, json).await?;
            written.push(package.summary_pdf_path());
            if config.write_json {
                written.push(package.summary_json_path());
            }
        }

        observer.progress(1.0);
        info!(students = documents.len(), unassigned = summary.unassigned.len(), "run finished");

        if config.dry_run {
            observer.info(&format!(
                "Dry run: would create output for {} student(s) in {}",
                documents.len(),
                config.output.display()
            ));
        } else {
            observer.success(&format!("Done. Created output for {} student(s).", documents.len()));
        }

        if let Some(warning) = summary.degraded_warning() {
            observer.warning(&warning);
        }

        Ok(RunReport {
            summary,
            assignment,
            documents,
            written,
            merge: merged.statistics,
            elapsed: start.elapsed(),
        })
    }
}

/// Run a split with the default decoder.
pub async fn split_exam(config: Config, observer: &RunObserver, cancel: &CancelFlag) -> Result<RunReport> {
    ExamSplitter::new(config).run(observer, cancel).await
}
