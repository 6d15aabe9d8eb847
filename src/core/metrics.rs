//! Listener metrics for observability
//!
//! Counters for monitoring listener health: how many writes were dispatched,
//! gated by the `off` level, or lost to backend failures, observer panics and
//! disposal.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for listener observability
///
/// # Example
///
/// ```
/// use trace_bridge::ListenerMetrics;
///
/// let metrics = ListenerMetrics::new();
///
/// metrics.record_dispatched();
/// metrics.record_backend_failure();
///
/// assert_eq!(metrics.dispatched(), 1);
/// assert_eq!(metrics.backend_failures(), 1);
/// ```
#[derive(Debug)]
pub struct ListenerMetrics {
    /// Events built and handed to the backend
    dispatched: AtomicU64,

    /// Writes dropped because their level was `off`
    gated: AtomicU64,

    /// Backend forwards that returned an error or panicked
    backend_failures: AtomicU64,

    /// Observer invocations that panicked
    observer_failures: AtomicU64,

    /// Writes swallowed after dispose
    dropped_after_dispose: AtomicU64,
}

impl ListenerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            gated: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            observer_failures: AtomicU64::new(0),
            dropped_after_dispose: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn gated(&self) -> u64 {
        self.gated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn backend_failures(&self) -> u64 {
        self.backend_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn observer_failures(&self) -> u64 {
        self.observer_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_after_dispose(&self) -> u64 {
        self.dropped_after_dispose.load(Ordering::Relaxed)
    }

    /// Record a dispatched event, returning the previous count
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_gated(&self) -> u64 {
        self.gated.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_backend_failure(&self) -> u64 {
        self.backend_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_observer_failure(&self) -> u64 {
        self.observer_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped_after_dispose(&self) -> u64 {
        self.dropped_after_dispose.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of dispatched events the backend failed on (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been dispatched.
    pub fn backend_failure_rate(&self) -> f64 {
        let dispatched = self.dispatched() as f64;
        if dispatched == 0.0 {
            0.0
        } else {
            (self.backend_failures() as f64 / dispatched) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.gated.store(0, Ordering::Relaxed);
        self.backend_failures.store(0, Ordering::Relaxed);
        self.observer_failures.store(0, Ordering::Relaxed);
        self.dropped_after_dispose.store(0, Ordering::Relaxed);
    }
}

impl Default for ListenerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ListenerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched()),
            gated: AtomicU64::new(self.gated()),
            backend_failures: AtomicU64::new(self.backend_failures()),
            observer_failures: AtomicU64::new(self.observer_failures()),
            dropped_after_dispose: AtomicU64::new(self.dropped_after_dispose()),
        }
    }
}
