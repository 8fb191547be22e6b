//! Progress reporting for a migration run.
//!
//! The pipeline emits [`ProgressEvent`]s and never formats anything for
//! display; a [`ProgressSink`] decides how (and whether) to show them.

use std::fmt;
use std::io::{stderr, IsTerminal};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Users, projects and the issue list.
    Bootstrap,
    /// Per-issue attachment and comment metadata, plus binaries.
    Attachments,
    /// Uploads, issue creation and notes.
    Posting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Bootstrap => "Fetching",
            Phase::Attachments => "Downloading",
            Phase::Posting => "Posting",
        };
        f.write_str(label)
    }
}

/// `current` of `total` items of `phase` are done; `label` names the last
/// one. A `total` of zero means the amount of work is not known yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current: usize,
    pub total: usize,
    pub label: String,
}

impl ProgressEvent {
    pub fn new(phase: Phase, current: usize, total: usize, label: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            label: label.into(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);

    /// Called once the run is over, successful or not.
    fn finish(&self) {}
}

/// Discards every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn event(&self, _event: ProgressEvent) {}
}

/// Renders events as one indicatif bar per phase on stderr.
pub struct ConsoleProgress {
    show: bool,
    current: Mutex<Option<(Phase, ProgressBar)>>,
}

impl ConsoleProgress {
    /// Bars are only drawn when `enabled` and stderr is a terminal.
    pub fn new(enabled: bool) -> Self {
        Self {
            show: enabled && stderr().is_terminal(),
            current: Mutex::new(None),
        }
    }

    fn bar_for(&self, phase: Phase, length: Option<u64>) -> ProgressBar {
        if !self.show {
            return ProgressBar::with_draw_target(length, ProgressDrawTarget::hidden());
        }

        let Some(total) = length else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar.set_prefix(phase.to_string());
            return bar;
        };

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{prefix:>12.cyan.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        bar.set_prefix(phase.to_string());
        bar
    }
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };

        let length = (event.total > 0).then_some(event.total as u64);
        let stale = match current.as_ref() {
            Some((phase, bar)) => *phase != event.phase || bar.length() != length,
            None => true,
        };
        if stale {
            if let Some((_, bar)) = current.take() {
                bar.finish_and_clear();
            }
            *current = Some((event.phase, self.bar_for(event.phase, length)));
        }

        if let Some((_, bar)) = current.as_ref() {
            bar.set_position(event.current as u64);
            bar.set_message(event.label);
        }
    }

    fn finish(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some((_, bar)) = current.take() {
                bar.finish_and_clear();
            }
        }
    }
}
