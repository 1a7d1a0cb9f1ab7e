//! Built-in counting observer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use message::Direction;

use crate::StatsSink;

#[derive(Default)]
struct DirectionTally {
    accepted: AtomicU64,
    forwarded: AtomicU64,
    dwell_micros: AtomicU64,
}

/// Counting [`StatsSink`]: accepted/forwarded totals and cumulative dwell
/// time per direction, readable as a snapshot at any time.
#[derive(Default)]
pub struct TallyStats {
    requests: DirectionTally,
    replies: DirectionTally,
}

impl TallyStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn side(&self, direction: Direction) -> &DirectionTally {
        match direction {
            Direction::Request => &self.requests,
            Direction::Reply => &self.replies,
        }
    }

    /// Point-in-time counters for one direction.
    pub fn snapshot(&self, direction: Direction) -> TallySnapshot {
        let side = self.side(direction);
        TallySnapshot {
            accepted: side.accepted.load(Ordering::Relaxed),
            forwarded: side.forwarded.load(Ordering::Relaxed),
            dwell_micros: side.dwell_micros.load(Ordering::Relaxed),
        }
    }
}

impl StatsSink for TallyStats {
    fn accepted(&self, direction: Direction) {
        self.side(direction).accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn forwarded(&self, direction: Direction, dwell: Duration) {
        let side = self.side(direction);
        side.forwarded.fetch_add(1, Ordering::Relaxed);
        side.dwell_micros
            .fetch_add(dwell.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Counters for one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    /// Messages that entered a collection.
    pub accepted: u64,
    /// Messages handed to the outlet.
    pub forwarded: u64,
    /// Total time forwarded messages spent held, in microseconds.
    pub dwell_micros: u64,
}

impl TallySnapshot {
    /// Mean dwell time of forwarded messages.
    pub fn mean_dwell(&self) -> Duration {
        if self.forwarded == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.dwell_micros / self.forwarded)
        }
    }
}
