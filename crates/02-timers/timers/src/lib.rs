#![deny(missing_docs)]
//! Scheduler/timer substrate driving time-based firing policies.
//!
//! One contract, two interchangeable implementations:
//! * [`WallScheduler`] – live deployments; a dedicated timer thread sleeps on
//!   a condvar until the earliest pending deadline.
//! * [`VirtualScheduler`] – offline simulation/evaluation; time is an integer
//!   advanced only by [`VirtualScheduler::advance_to`], which runs due
//!   callbacks on the calling thread.
//!
//! Entries with equal deadlines fire in submission order (FIFO), so a
//! simulation run is reproducible given a fixed seed. Cancelling a timer that
//! already fired or is concurrently firing is a no-op, never an error.

mod entry;
mod sim;
mod wall;

pub use sim::VirtualScheduler;
pub use wall::WallScheduler;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Decision returned by a recurring task after each firing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Re-arm the timer for one more interval.
    Continue,
    /// Stop cooperatively; the timer is not re-armed.
    Stop,
}

/// One-shot callback.
pub type OneShotTask = Box<dyn FnOnce() + Send + 'static>;

/// Recurring callback; re-armed only while it returns [`Repeat::Continue`].
pub type RecurringTask = Box<dyn FnMut() -> Repeat + Send + 'static>;

/// Handle to a scheduled timer.
#[derive(Clone)]
pub struct TimerKey {
    cancelled: Arc<AtomicBool>,
}

impl TimerKey {
    pub(crate) fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests that the timer never fires again. A key whose timer already
    /// fired (or is firing right now) is simply past saving; nothing happens.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`TimerKey::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Contract every timer substrate implements.
pub trait Scheduler: Send + Sync + 'static {
    /// Monotonic time since the scheduler started.
    fn now(&self) -> Duration;

    /// Schedules `task` to run once, `delay` from now.
    fn once(&self, delay: Duration, task: OneShotTask) -> TimerKey;

    /// Schedules `task` to run every `interval`, first firing one interval
    /// from now. Re-arming uses the previous deadline plus `interval`, so the
    /// tick train stays exactly periodic.
    fn every(&self, interval: Duration, task: RecurringTask) -> TimerKey;
}
