//! Terminal progress bar for the page scan.
//!
//! The scan reports progress as a fraction in `[0, 1]`. The bar redraws the
//! current line at most every 100 ms and shows the elapsed time and, once a
//! few percent are done, an estimate of the remaining time.
//!
//! # Examples
//!
//! ```
//! use examsplit::output::progress::ProgressBar;
//!
//! let mut progress = ProgressBar::fractional();
//! progress.set_message("Reading QR codes");
//! progress.set_fraction(0.5);
//! progress.finish();
//! ```

use std::io::{self, Write};
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 40;

/// Below this fraction no remaining time is estimated.
const MIN_FRACTION_FOR_ESTIMATE: f64 = 0.05;

/// Single-line progress bar.
#[derive(Debug)]
pub struct ProgressBar {
    fraction: f64,
    message: Option<String>,
    start_time: Instant,
    last_draw: Option<Instant>,
    redraw_interval: Duration,
    enabled: bool,
}

impl ProgressBar {
    /// A bar that draws when stdout is a terminal.
    pub fn fractional() -> Self {
        use std::io::IsTerminal;

        Self {
            fraction: 0.0,
            message: None,
            start_time: Instant::now(),
            last_draw: None,
            redraw_interval: Duration::from_millis(100),
            enabled: io::stdout().is_terminal(),
        }
    }

    /// A bar that never draws.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::fractional()
        }
    }

    /// Whether the bar renders anything.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Text shown before the bar.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Current fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Move the bar. Values outside `[0, 1]` are clamped, NaN counts as 0.
    pub fn set_fraction(&mut self, fraction: f64) {
        self.fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let due = self
            .last_draw
            .is_none_or(|last| last.elapsed() >= self.redraw_interval);
        if due || self.fraction >= 1.0 {
            self.draw();
        }
    }

    /// Fill the bar and end the line.
    pub fn finish(&mut self) {
        self.fraction = 1.0;
        if self.enabled {
            self.draw();
            println!();
            self.enabled = false;
        }
    }

    /// Erase the bar from the current line.
    pub fn clear(&self) {
        if self.enabled {
            print!("\r\x1b[K");
            io::stdout().flush().ok();
        }
    }

    fn draw(&mut self) {
        if !self.enabled {
            return;
        }
        self.last_draw = Some(Instant::now());
        print!("\r{}", self.line(self.start_time.elapsed()));
        io::stdout().flush().ok();
    }

    fn line(&self, elapsed: Duration) -> String {
        let filled = (self.fraction * BAR_WIDTH as f64).round() as usize;
        let head = if filled > 0 && filled < BAR_WIDTH { ">" } else { "" };
        let body = "=".repeat(filled.saturating_sub(head.len()));
        let bar = format!("[{body}{head}{}]", " ".repeat(BAR_WIDTH - filled));

        let mut parts = Vec::with_capacity(5);
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        parts.push(bar);
        parts.push(format!("{:.0}%", self.fraction * 100.0));
        parts.push(format_duration(elapsed));

        if let Some(remaining) = self.remaining(elapsed) {
            parts.push(format!("(~{} left)", format_duration(remaining)));
        }

        parts.join(" ")
    }

    fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        if self.fraction < MIN_FRACTION_FOR_ESTIMATE || self.fraction >= 1.0 {
            return None;
        }
        let total = elapsed.as_secs_f64() / self.fraction;
        Some(Duration::from_secs_f64(total - elapsed.as_secs_f64()))
    }
}

/// Format a duration as a human-readable string.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
