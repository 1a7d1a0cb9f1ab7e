use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct RouterMetrics {
    forwarded: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    dummies: AtomicU64,
}

impl RouterMetrics {
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dummy(&self) {
        self.dummies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dummies: self.dummies.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters of router activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouterMetricsSnapshot {
    /// Frames pushed onto the outbound inter-mix queue.
    pub forwarded: u64,
    /// Payloads handed to a local port or channel.
    pub delivered: u64,
    /// Messages dropped (unknown target, closed receiver, shutdown).
    pub dropped: u64,
    /// Dummies consumed at their final hop.
    pub dummies: u64,
}
