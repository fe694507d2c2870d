//! examsplit - Split merged exam scans into one PDF per student.
//!
//! Command-line front end of the `examsplit` library.

mod cli;

use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use examsplit::config::{Config, OverwriteMode};
use examsplit::error::ExamSplitError;
use examsplit::output::{ConsoleReporter, OutputFormatter, RunObserver};
use examsplit::package::SUMMARY_PDF;
use examsplit::pipeline::ExamSplitter;
use examsplit::scan::CancelFlag;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main application logic.
async fn run(cli: Cli) -> Result<(), ExamSplitError> {
    cli.validate()?;

    let inputs = cli.resolve_inputs()?;
    let config = cli.to_config(inputs)?;
    tracing::debug!(inputs = config.inputs.len(), output = %config.output.display(), "configuration resolved");

    let reporter = Arc::new(ConsoleReporter::new(config.quiet, config.verbose));
    let formatter = reporter.formatter().clone();

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", examsplit::NAME, examsplit::VERSION));
        formatter.blank_line();
    }

    if !config.dry_run {
        handle_output_overwrite(&config, &formatter).await?;
    }

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let observer = RunObserver::new(reporter.clone(), reporter.clone());
    let result = ExamSplitter::new(config).run(&observer, &cancel).await;
    reporter.finish();
    let report = result?;

    if formatter.is_verbose() {
        formatter.blank_line();
        formatter.section("Statistics");
        formatter.detail("Input files", &report.merge.files_merged.to_string());
        if report.merge.files_skipped > 0 {
            formatter.detail("Skipped files", &report.merge.files_skipped.to_string());
        }
        formatter.detail("Pages scanned", &report.summary.total_pages.to_string());
        formatter.detail("Input size", &report.merge.format_input_size());
        formatter.detail("Students", &report.summary.students.len().to_string());
        formatter.detail("Unassigned pages", &report.summary.unassigned.len().to_string());
        formatter.detail(
            "Load time",
            &format!("{:.2}s", report.merge.load_time.as_secs_f64()),
        );
        formatter.detail("Total time", &format!("{:.2}s", report.elapsed.as_secs_f64()));

        formatter.section("Students");
        for row in &report.summary.students {
            formatter.table_row(&[&row.display_name, &row.routing_key, &row.page_count.to_string()]);
        }

        if !report.written.is_empty() {
            formatter.section("Files written");
            for (index, path) in report.written.iter().enumerate() {
                formatter.list_item(index + 1, &path.display().to_string());
            }
        }
    }

    Ok(())
}

/// Handle an existing package in the output directory.
///
/// A package exists when the output directory already holds a summary PDF.
async fn handle_output_overwrite(
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<(), ExamSplitError> {
    let summary = config.output.join(SUMMARY_PDF);
    if !tokio::fs::try_exists(&summary).await.unwrap_or(false) {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(ExamSplitError::output_exists(summary)),
        OverwriteMode::Prompt => {
            if formatter.is_quiet() {
                return Err(ExamSplitError::output_exists(summary));
            }

            formatter.warning(&format!(
                "Output already contains a package: {}",
                config.output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| ExamSplitError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(ExamSplitError::Cancelled)
            }
        }
    }
}
