//! Per-query memory budget tracking.
//!
//! Aggregation stages grow unbounded state with input cardinality. Each state
//! mutation reports its approximate byte growth to a shared [`MemoryTracker`];
//! the first growth that crosses the budget latches the tracker as exceeded,
//! and the runtime cancels the query instead of letting it run away.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared per-query budget tracker.
///
/// `grow` is called from worker threads; everything else is cheap reads. The
/// exceeded flag latches: once the budget is crossed the query is doomed even
/// if later state merges would shrink usage.
#[derive(Debug)]
pub struct MemoryTracker {
    budget_bytes: usize,
    used_bytes: AtomicUsize,
    exceeded: AtomicBool,
}

impl MemoryTracker {
    /// Create a tracker with a hard budget. `usize::MAX` disables enforcement.
    #[must_use]
    pub fn new(budget_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            budget_bytes,
            used_bytes: AtomicUsize::new(0),
            exceeded: AtomicBool::new(false),
        })
    }

    /// Record `bytes` of state growth. Returns `false` once the budget has
    /// been crossed; callers should stop doing useful work and let the
    /// runtime's cancel signal propagate.
    pub fn grow(&self, bytes: usize) -> bool {
        if bytes == 0 {
            return !self.exceeded.load(Ordering::Relaxed);
        }
        let used = self.used_bytes.fetch_add(bytes, Ordering::AcqRel) + bytes;
        if used > self.budget_bytes {
            self.exceeded.store(true, Ordering::Release);
            return false;
        }
        !self.exceeded.load(Ordering::Relaxed)
    }

    /// Approximate bytes of tracked state so far.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.used_bytes.load(Ordering::Acquire)
    }

    /// The configured budget.
    #[must_use]
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Whether the budget has been crossed at any point.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded.load(Ordering::Acquire)
    }
}
