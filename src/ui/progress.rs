use crate::executor::Sink;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Percentage bar (0-100) for a removal run
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Colour a log line by its leading marker.
pub fn colorize(line: &str) -> ColoredString {
    if line.starts_with("[OK]") {
        line.green()
    } else if line.starts_with("[X]") {
        line.red()
    } else if line.starts_with("[SKIP]") || line.starts_with("[!]") {
        line.yellow()
    } else {
        line.normal()
    }
}

/// Terminal sink: log lines above a progress bar, status as the bar message.
pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            bar: create_progress_bar(),
        }
    }

    /// No terminal output at all (used with `--json`).
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn log_message(&self, text: &str) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.println(colorize(text).to_string());
    }

    fn update_status(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn update_progress(&self, percentage: f64) {
        self.bar.set_position(percentage.clamp(0.0, 100.0).round() as u64);
    }
}
