//! Cooperative progress and cancellation.
//!
//! A [`Monitor`] is threaded through every `process` call and checked by
//! the runner between slices. The engine itself never polls; operations
//! are expected to poll during long computations, and the caller stops
//! scheduling further slices once cancellation is observed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Caller-supplied progress/cancellation token.
pub trait Monitor {
    /// Whether the run has been cancelled.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Report completed work units.
    fn worked(&self, _amount: usize) {}

    /// Report the name of the current subtask.
    fn subtask(&self, _name: &str) {}
}

/// Monitor that never cancels and discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl Monitor for NullMonitor {}

/// Shareable monitor backed by an atomic flag.
///
/// Clones observe the same flag, so one handle can cancel a run driven
/// from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
    worked: Arc<AtomicUsize>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed by every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Total work units reported so far.
    pub fn total_worked(&self) -> usize {
        self.worked.load(Ordering::Relaxed)
    }
}

impl Monitor for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn worked(&self, amount: usize) {
        self.worked.fetch_add(amount, Ordering::Relaxed);
    }
}
