//! Run-wide progress accounting
//!
//! One tracker spans the whole run. Its total is fixed up front at
//! [`UNITS_PER_SCRIPT`] units per script: the bundling phase maps its
//! fractional progress onto the first 80% and the archive builder ticks one
//! unit per archive entry written, which fills the remaining 20%.
//!
//! Rendering is delegated to a [`ProgressSink`]; [`NoopProgress`] can be
//! substituted anywhere without changing packaging behavior.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Progress units reserved per script.
pub const UNITS_PER_SCRIPT: u64 = 10;
/// Share of the total reserved for bundling.
pub const BUNDLE_WEIGHT: f64 = 0.8;
/// Entries written into every archive (manifest + bundle), one tick each.
pub const ENTRIES_PER_ARCHIVE: u64 = 2;

/// Renders progress. Implementations must tolerate calls from many tasks.
pub trait ProgressSink: Send + Sync {
    /// `fraction` is the overall completion in `0.0..=1.0`.
    fn report(&self, fraction: f64, label: &str);

    /// Draw now, bypassing any throttling. Called when the label changes.
    fn redraw(&self) {}

    fn finish(&self, _message: &str) {}

    fn abandon(&self, _message: &str) {}
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _fraction: f64, _label: &str) {}
}

struct TrackerState {
    sink: Arc<dyn ProgressSink>,
    total: u64,
    position: AtomicU64,
    label: Mutex<String>,
}

/// Shared, clonable handle onto the run's progress counter.
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<TrackerState>,
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>, scripts: usize) -> Self {
        Self {
            state: Arc::new(TrackerState {
                sink,
                total: (scripts as u64).saturating_mul(UNITS_PER_SCRIPT).max(1),
                position: AtomicU64::new(0),
                label: Mutex::new(String::new()),
            }),
        }
    }

    #[must_use]
    pub fn noop(scripts: usize) -> Self {
        Self::new(Arc::new(NoopProgress), scripts)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.state.total
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.state.position.load(Ordering::SeqCst)
    }

    /// Bundler callback: `percent` of the bundling phase is done.
    ///
    /// Never moves the counter backwards.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn bundling(&self, percent: f64, phase: &str, detail: Option<&str>) {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = (percent * BUNDLE_WEIGHT * self.state.total as f64).round() as u64;
        self.state.position.fetch_max(target, Ordering::SeqCst);

        let label = match detail {
            Some(detail) if !detail.is_empty() => format!("{phase}: {detail}"),
            _ => phase.to_string(),
        };
        self.publish(&label);
    }

    /// Advance by one unit (one archive entry written).
    pub fn tick(&self, label: &str) {
        let total = self.state.total;
        let _ = self
            .state
            .position
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pos| {
                Some((pos + 1).min(total))
            });
        self.publish(label);
    }

    pub fn finish(&self, message: &str) {
        self.state.position.store(self.state.total, Ordering::SeqCst);
        self.state.sink.finish(message);
    }

    pub fn abandon(&self, message: &str) {
        self.state.sink.abandon(message);
    }

    #[allow(clippy::cast_precision_loss)]
    fn publish(&self, label: &str) {
        let changed = {
            let mut last = self.state.label.lock();
            if *last == label {
                false
            } else {
                label.clone_into(&mut *last);
                true
            }
        };
        let fraction = self.position() as f64 / self.state.total as f64;
        self.state.sink.report(fraction, label);
        if changed {
            self.state.sink.redraw();
        }
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.state.total)
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}
