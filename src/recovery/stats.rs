//! Recovery counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated by the correlator and dispatcher
#[derive(Debug, Default)]
pub struct RecallStats {
    archived: AtomicU64,
    revocations: AtomicU64,
    restored: AtomicU64,
    partial: AtomicU64,
    missed: AtomicU64,
    skipped: AtomicU64,
    send_fallbacks: AtomicU64,
    sends_dropped: AtomicU64,
}

/// Point-in-time view of the counters plus archive occupancy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub archived: u64,
    pub revocations: u64,
    pub restored: u64,
    pub partial: u64,
    pub missed: u64,
    pub skipped: u64,
    pub send_fallbacks: u64,
    pub sends_dropped: u64,
    /// Logical records currently archived
    pub records: usize,
    /// Entries summed across the three archive indexes
    pub index_entries: usize,
}

impl RecallStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_archived(&self) {
        self.archived.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_revocation(&self) {
        self.revocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restored(&self) {
        self.restored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_partial(&self) {
        self.partial.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_missed(&self) {
        self.missed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_fallback(&self) {
        self.send_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_dropped(&self) {
        self.sends_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter values; archive occupancy fields are left at zero
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            archived: self.archived.load(Ordering::Relaxed),
            revocations: self.revocations.load(Ordering::Relaxed),
            restored: self.restored.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            send_fallbacks: self.send_fallbacks.load(Ordering::Relaxed),
            sends_dropped: self.sends_dropped.load(Ordering::Relaxed),
            records: 0,
            index_entries: 0,
        }
    }
}
