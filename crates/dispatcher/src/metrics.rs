//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Fires that passed the single-flight check
    fires_started: AtomicU64,
    /// Fires that ran every connected listener
    fires_completed: AtomicU64,
    /// Fires stopped by a listener cancelling the event
    fires_event_cancelled: AtomicU64,
    /// Fires aborted from outside
    fires_aborted: AtomicU64,
    /// Fires ended by a listener error or panic
    fires_failed: AtomicU64,
    /// Listener tasks spawned
    listener_invocations: AtomicU64,
    /// Calls rejected as usage errors
    usage_rejections: AtomicU64,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fires_started(&self) -> u64 {
        self.fires_started.load(Ordering::Relaxed)
    }

    pub fn inc_fires_started(&self) {
        self.fires_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fires_completed(&self) -> u64 {
        self.fires_completed.load(Ordering::Relaxed)
    }

    pub fn inc_fires_completed(&self) {
        self.fires_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fires_event_cancelled(&self) -> u64 {
        self.fires_event_cancelled.load(Ordering::Relaxed)
    }

    pub fn inc_fires_event_cancelled(&self) {
        self.fires_event_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fires_aborted(&self) -> u64 {
        self.fires_aborted.load(Ordering::Relaxed)
    }

    pub fn inc_fires_aborted(&self) {
        self.fires_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fires_failed(&self) -> u64 {
        self.fires_failed.load(Ordering::Relaxed)
    }

    pub fn inc_fires_failed(&self) {
        self.fires_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn listener_invocations(&self) -> u64 {
        self.listener_invocations.load(Ordering::Relaxed)
    }

    pub fn inc_listener_invocations(&self) {
        self.listener_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn usage_rejections(&self) -> u64 {
        self.usage_rejections.load(Ordering::Relaxed)
    }

    pub fn inc_usage_rejections(&self) {
        self.usage_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fires_started: self.fires_started(),
            fires_completed: self.fires_completed(),
            fires_event_cancelled: self.fires_event_cancelled(),
            fires_aborted: self.fires_aborted(),
            fires_failed: self.fires_failed(),
            listener_invocations: self.listener_invocations(),
            usage_rejections: self.usage_rejections(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fires_started: u64,
    pub fires_completed: u64,
    pub fires_event_cancelled: u64,
    pub fires_aborted: u64,
    pub fires_failed: u64,
    pub listener_invocations: u64,
    pub usage_rejections: u64,
}

impl MetricsSnapshot {
    /// Fires that returned, whatever the outcome
    pub fn fires_finished(&self) -> u64 {
        self.fires_completed + self.fires_event_cancelled + self.fires_aborted + self.fires_failed
    }
}
