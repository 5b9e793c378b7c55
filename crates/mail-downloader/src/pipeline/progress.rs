use std::fmt;

use indicatif::{ProgressBar, ProgressStyle};

/// Stages of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fetching,
    Draining,
    Processing,
    Reporting,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Fetching => "Searching",
            RunPhase::Draining => "Fetching",
            RunPhase::Processing => "Writing",
            RunPhase::Reporting => "Reporting",
            RunPhase::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Events emitted by the pipeline during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A new phase starts; `total` is the number of records it will handle.
    Phase {
        phase: RunPhase,
        total: Option<usize>,
    },
    /// One record done in the current phase.
    Advance,
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for tests and `--no-progress`.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg:>10} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase {
                phase: RunPhase::Done,
                ..
            } => self.bar.finish_and_clear(),
            ProgressEvent::Phase { phase, total } => {
                self.bar.set_message(phase.to_string());
                self.bar.set_length(total.unwrap_or(0) as u64);
                self.bar.set_position(0);
            }
            ProgressEvent::Advance => self.bar.inc(1),
        }
    }
}
