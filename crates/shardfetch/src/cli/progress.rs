//! Spinner showing live per-outcome counts.

use indicatif::{ProgressBar, ProgressStyle};
use shardfetch_core::{Outcome, RunSummary};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live progress display driven by the pipeline's outcome observer.
pub struct Progress {
    bar: ProgressBar,
    written: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Progress {
    /// Create a spinner, or a hidden one when `visible` is false.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} items ({per_sec}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("starting...");

        Self {
            bar,
            written: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Count one finished item.
    pub fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Written { .. } => &self.written,
            Outcome::Skipped { .. } => &self.skipped,
            Outcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
        self.bar.set_message(format!(
            "{} written, {} skipped, {} failed",
            self.written.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Print the summary table to stderr, next to the logs and progress display.
pub fn print_summary(summary: &RunSummary) {
    let _ = write_summary(&mut std::io::stderr().lock(), summary);
}

/// Render a formatted summary table after the run.
pub fn write_summary<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    let mb_written = summary.bytes_written as f64 / 1_000_000.0;

    writeln!(out)?;
    writeln!(out, "  ====================================")?;
    writeln!(out, "               Summary")?;
    writeln!(out, "  ====================================")?;
    writeln!(out, "    Written:      {:>8}", summary.written)?;
    if summary.skipped > 0 {
        writeln!(out, "    Skipped:      {:>8}", summary.skipped)?;
    }
    if summary.failed > 0 {
        writeln!(out, "    Failed:       {:>8}", summary.failed)?;
    }
    writeln!(out, "  ------------------------------------")?;
    writeln!(out, "    Total:        {:>8}", summary.total())?;
    writeln!(out, "    Saved:        {:>7.1} MB", mb_written)?;
    writeln!(out, "    Duration:     {:>7.1}s", summary.elapsed.as_secs_f64())?;
    writeln!(out, "    Rate:         {:>7.1} img/sec", summary.rate())?;
    writeln!(out, "    Peak queue:   {:>8}", summary.peak_queue_depth)?;
    writeln!(out, "  ====================================")
}
