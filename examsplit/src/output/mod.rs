//! Output and reporting channels.
//!
//! The library never prints directly. A run reports through two narrow
//! interfaces that the caller injects with a [`RunObserver`]:
//! - [`Logger`] receives leveled, human-readable messages
//! - [`ProgressSink`] receives scan progress as a fraction in `[0, 1]`
//!
//! Both have no-op implementations, so library users and tests only
//! implement what they need. [`ConsoleReporter`] drives the terminal.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use examsplit::output::{ConsoleReporter, RunObserver};
//!
//! let reporter = Arc::new(ConsoleReporter::new(false, false));
//! let observer = RunObserver::new(reporter.clone(), reporter);
//! observer.info("Reading QR codes...");
//! observer.progress(0.25);
//! ```

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::ProgressBar;

use std::sync::{Arc, Mutex};

/// Sink for leveled run messages.
pub trait Logger: Send + Sync {
    /// Record one message.
    fn emit(&self, message: &str, level: MessageLevel);
}

/// Sink for run progress.
pub trait ProgressSink: Send + Sync {
    /// Report progress as a fraction in `[0, 1]`.
    fn report(&self, fraction: f64);
}

/// Logger that discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn emit(&self, _message: &str, _level: MessageLevel) {}
}

/// Progress sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _fraction: f64) {}
}

/// The logger and progress sink of one run.
#[derive(Clone)]
pub struct RunObserver {
    logger: Arc<dyn Logger>,
    progress: Arc<dyn ProgressSink>,
}

impl RunObserver {
    /// Create an observer from a logger and a progress sink.
    pub fn new(logger: Arc<dyn Logger>, progress: Arc<dyn ProgressSink>) -> Self {
        Self { logger, progress }
    }

    /// An observer that discards everything.
    pub fn silent() -> Self {
        Self::new(Arc::new(NoopLogger), Arc::new(NoopProgress))
    }

    /// Replace the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the progress sink.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Emit a message at the given level.
    pub fn log(&self, level: MessageLevel, message: &str) {
        self.logger.emit(message, level);
    }

    /// Emit an informational message.
    pub fn info(&self, message: &str) {
        self.log(MessageLevel::Info, message);
    }

    /// Emit a success message.
    pub fn success(&self, message: &str) {
        self.log(MessageLevel::Success, message);
    }

    /// Emit a warning.
    pub fn warning(&self, message: &str) {
        self.log(MessageLevel::Warning, message);
    }

    /// Emit an error message.
    pub fn error(&self, message: &str) {
        self.log(MessageLevel::Error, message);
    }

    /// Emit a debug message.
    pub fn debug(&self, message: &str) {
        self.log(MessageLevel::Debug, message);
    }

    /// Report progress.
    pub fn progress(&self, fraction: f64) {
        self.progress.report(fraction);
    }
}

impl Default for RunObserver {
    fn default() -> Self {
        Self::silent()
    }
}

impl std::fmt::Debug for RunObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunObserver").finish_non_exhaustive()
    }
}

/// Terminal reporter: messages through an [`OutputFormatter`], progress
/// through a [`ProgressBar`].
///
/// Messages clear the bar line first so they do not get mixed into it; the
/// bar is drawn again on the next progress report.
#[derive(Debug)]
pub struct ConsoleReporter {
    formatter: OutputFormatter,
    bar: Mutex<ProgressBar>,
}

impl ConsoleReporter {
    /// Create a reporter. The bar is disabled in quiet mode.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let bar = if quiet {
            ProgressBar::disabled()
        } else {
            let mut bar = ProgressBar::fractional();
            bar.set_message("Reading QR codes");
            bar
        };

        Self {
            formatter: OutputFormatter::new(quiet, verbose),
            bar: Mutex::new(bar),
        }
    }

    /// The formatter used for messages.
    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    /// Finish and release the progress line.
    pub fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            bar.finish();
        }
    }
}

impl Logger for ConsoleReporter {
    fn emit(&self, message: &str, level: MessageLevel) {
        match self.bar.lock() {
            Ok(bar) => {
                bar.clear();
                self.formatter.message(level, message);
            }
            Err(_) => self.formatter.message(level, message),
        }
    }
}

impl ProgressSink for ConsoleReporter {
    fn report(&self, fraction: f64) {
        if let Ok(mut bar) = self.bar.lock() {
            bar.set_fraction(fraction);
        }
    }
}
