//! Terminal rendering of run messages.
//!
//! [`OutputFormatter`] decides per [`MessageLevel`] whether a message is
//! shown and how it looks. Warnings and errors survive quiet mode and go to
//! stderr; debug messages need verbose mode.
//!
//! # Examples
//!
//! ```
//! use examsplit::output::formatter::{MessageLevel, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.message(MessageLevel::Info, "Reading QR codes...");
//! formatter.warning("2 page(s) could not be assigned");
//! ```

use serde::Serialize;
use std::io::{self, IsTerminal};

/// Level of a run message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// Page decisions and progress notes.
    Info,
    /// Final outcome of a successful run.
    Success,
    /// Something the user should check.
    Warning,
    /// Something that went wrong.
    Error,
    /// Detail for verbose runs.
    Debug,
}

impl MessageLevel {
    fn marker(self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Success => "✓ ",
            Self::Warning => "⚠ ",
            Self::Error => "✗ ",
            Self::Debug => "→ ",
        }
    }

    fn ansi(self) -> Option<&'static str> {
        match self {
            Self::Info => None,
            Self::Success => Some("32"),
            Self::Warning => Some("33"),
            Self::Error => Some("31"),
            Self::Debug => Some("36"),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

/// Renders messages and the CLI's summary blocks.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    quiet: bool,
    verbose: bool,
    colored: bool,
}

impl OutputFormatter {
    /// Formatter for the given verbosity. Color is used on terminals with
    /// `TERM` set.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            colored: io::stdout().is_terminal() && std::env::var_os("TERM").is_some(),
        }
    }

    /// Formatter that only shows warnings and errors.
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Whether a message at `level` is shown.
    pub fn shows(&self, level: MessageLevel) -> bool {
        match level {
            MessageLevel::Warning | MessageLevel::Error => true,
            MessageLevel::Debug => self.verbose,
            MessageLevel::Info | MessageLevel::Success => !self.quiet,
        }
    }

    /// Print a message if its level is shown.
    pub fn message(&self, level: MessageLevel, message: &str) {
        if !self.shows(level) {
            return;
        }
        let line = self.render(level, message);
        if level.to_stderr() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    /// Print a warning.
    pub fn warning(&self, message: &str) {
        self.message(MessageLevel::Warning, message);
    }

    fn render(&self, level: MessageLevel, message: &str) -> String {
        let marker = level.marker();
        match level.ansi() {
            Some(code) if self.colored => format!("\x1b[{code}m{marker}{message}\x1b[0m"),
            _ => format!("{marker}{message}"),
        }
    }

    /// Section header.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n{title}");
        }
    }

    /// `label: value` line, verbose only.
    pub fn detail(&self, label: &str, value: &str) {
        if self.verbose {
            println!("  {label}: {value}");
        }
    }

    pub fn blank_line(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// Columns separated by a vertical bar.
    pub fn table_row(&self, columns: &[&str]) {
        if !self.quiet {
            println!("  {}", columns.join(" │ "));
        }
    }

    /// Numbered list entry, `index` is 1-based.
    pub fn list_item(&self, index: usize, message: &str) {
        if !self.quiet {
            println!("  {index}. {message}");
        }
    }

    pub fn should_print(&self) -> bool {
        !self.quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
