use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for monitoring queue activity.
///
/// Updated only when `Config::enable_metrics` is set; all counters use
/// relaxed ordering since they are advisory and never gate control flow.
#[derive(Debug, Default)]
pub struct Metrics {
    events_committed: AtomicU64,
    events_processed: AtomicU64,
    batches_committed: AtomicU64,
    reservations_granted: AtomicU64,
    reservations_denied: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_events_committed(&self, n: u64) {
        self.events_committed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_events_processed(&self, n: u64) {
        self.events_processed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_batches_committed(&self, n: u64) {
        self.batches_committed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_reservations_granted(&self, n: u64) {
        self.reservations_granted.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_reservations_denied(&self, n: u64) {
        self.reservations_denied.fetch_add(n, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_committed: self.events_committed.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            reservations_granted: self.reservations_granted.load(Ordering::Relaxed),
            reservations_denied: self.reservations_denied.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the queue's metrics counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Events published to the ring by successful commits.
    pub events_committed: u64,
    /// Events dequeued and dispatched by the consumer.
    pub events_processed: u64,
    /// Successful commit calls.
    pub batches_committed: u64,
    /// Reservations that granted at least one slot.
    pub reservations_granted: u64,
    /// Reservations denied (ring full or gate contended).
    pub reservations_denied: u64,
}
