//! Engine counters (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording engine counters
#[derive(Debug, Default)]
pub struct Metrics {
    events_received: AtomicU64,
    events_ignored: AtomicU64,
    events_malformed: AtomicU64,
    patches_applied: AtomicU64,
    patches_dropped: AtomicU64,
    snapshot_fetches: AtomicU64,
    snapshot_errors: AtomicU64,
    reconnects: AtomicU64,
    resets: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_malformed(&self) {
        self.events_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn patch_applied(&self) {
        self.patches_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn patch_dropped(&self) {
        self.patches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_fetch(&self) {
        self.snapshot_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_error(&self) {
        self.snapshot_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            events_malformed: self.events_malformed.load(Ordering::Relaxed),
            patches_applied: self.patches_applied.load(Ordering::Relaxed),
            patches_dropped: self.patches_dropped.load(Ordering::Relaxed),
            snapshot_fetches: self.snapshot_fetches.load(Ordering::Relaxed),
            snapshot_errors: self.snapshot_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_ignored: u64,
    pub events_malformed: u64,
    pub patches_applied: u64,
    pub patches_dropped: u64,
    pub snapshot_fetches: u64,
    pub snapshot_errors: u64,
    pub reconnects: u64,
    pub resets: u64,
}
