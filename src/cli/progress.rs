//! Terminal rendering for packaging progress
//!
//! Adapts to the output context:
//! - TTY mode: a single animated progress bar
//! - Non-TTY mode: one line per phase change
//! - Robot mode: JSON progress events to stderr
//! - Quiet mode: No output

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::IsTerminal;

use crate::packager::ProgressSink;

/// Bar resolution; the tracker reports fractions.
const BAR_LENGTH: u64 = 1000;

// ============================================================================
// Progress Mode Detection
// ============================================================================

/// Progress output mode based on terminal capabilities and user preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// TTY mode: animated progress bar
    Tty,
    /// Non-TTY mode: simple line-by-line output to stderr
    NonTty,
    /// Robot mode: JSON progress events to stderr
    Robot,
    /// Quiet mode: no progress output
    Quiet,
}

impl ProgressMode {
    /// Detect the appropriate progress mode based on environment
    #[must_use]
    pub fn detect(robot_mode: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if robot_mode {
            Self::Robot
        } else if std::io::stderr().is_terminal() {
            Self::Tty
        } else {
            Self::NonTty
        }
    }

    #[must_use]
    pub const fn has_output(&self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

// ============================================================================
// Progress Events (Robot Mode)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventType {
    ProgressUpdate,
    ProgressComplete,
    ProgressError,
}

/// JSON progress event for robot mode
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub event: ProgressEventType,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl ProgressEvent {
    fn new(event: ProgressEventType, operation: &str) -> Self {
        Self {
            event_type: "progress",
            event,
            operation: operation.to_string(),
            percent: None,
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    const fn with_percent(mut self, percent: u8) -> Self {
        self.percent = Some(percent);
        self
    }

    fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            eprintln!("{json}");
        }
    }
}

// ============================================================================
// Terminal Sink
// ============================================================================

#[derive(Debug, Default)]
struct Snapshot {
    fraction: f64,
    label: String,
}

/// [`ProgressSink`] that draws to the terminal in the detected mode.
pub struct TerminalProgress {
    mode: ProgressMode,
    bar: Option<ProgressBar>,
    last: Mutex<Snapshot>,
}

impl TerminalProgress {
    #[must_use]
    pub fn new(robot_mode: bool, quiet: bool) -> Self {
        Self::with_mode(ProgressMode::detect(robot_mode, quiet))
    }

    #[must_use]
    pub fn with_mode(mode: ProgressMode) -> Self {
        let bar = (mode == ProgressMode::Tty).then(|| {
            let pb = ProgressBar::new(BAR_LENGTH);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.cyan} {msg:30} [{bar:40.cyan/blue}] {percent:>3}%")
                .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("█▓▒░"));
            pb.set_style(style);
            pb
        });
        Self {
            mode,
            bar,
            last: Mutex::new(Snapshot::default()),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> ProgressMode {
        self.mode
    }

    fn snapshot(&self) -> (u8, String) {
        let last = self.last.lock();
        (percent(last.fraction), last.label.clone())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn bar_position(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64).round() as u64
}

impl ProgressSink for TerminalProgress {
    fn report(&self, fraction: f64, label: &str) {
        {
            let mut last = self.last.lock();
            last.fraction = fraction;
            label.clone_into(&mut last.label);
        }
        if let Some(pb) = &self.bar {
            pb.set_position(bar_position(fraction));
            pb.set_message(label.to_string());
        }
    }

    fn redraw(&self) {
        let (percent, label) = self.snapshot();
        match self.mode {
            ProgressMode::Tty => {
                if let Some(pb) = &self.bar {
                    pb.tick();
                }
            }
            ProgressMode::NonTty => eprintln!("[scriptpack] {label} ({percent}%)"),
            ProgressMode::Robot => {
                ProgressEvent::new(ProgressEventType::ProgressUpdate, &label)
                    .with_percent(percent)
                    .emit();
            }
            ProgressMode::Quiet => {}
        }
    }

    fn finish(&self, message: &str) {
        match self.mode {
            ProgressMode::Tty => {
                if let Some(pb) = &self.bar {
                    pb.finish_with_message(format!("✓ {message}"));
                }
            }
            ProgressMode::NonTty => eprintln!("[scriptpack] ✓ {message}"),
            ProgressMode::Robot => {
                ProgressEvent::new(ProgressEventType::ProgressComplete, "package")
                    .with_percent(100)
                    .with_message(message)
                    .emit();
            }
            ProgressMode::Quiet => {}
        }
    }

    fn abandon(&self, message: &str) {
        let (percent, _) = self.snapshot();
        match self.mode {
            ProgressMode::Tty => {
                if let Some(pb) = &self.bar {
                    pb.abandon_with_message(format!("✗ {message}"));
                }
            }
            ProgressMode::NonTty => eprintln!("[scriptpack] ✗ ERROR: {message}"),
            ProgressMode::Robot => {
                ProgressEvent::new(ProgressEventType::ProgressError, "package")
                    .with_percent(percent)
                    .with_message(message)
                    .emit();
            }
            ProgressMode::Quiet => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
