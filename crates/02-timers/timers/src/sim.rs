//! Virtual-clock scheduler for offline simulation and deterministic tests.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::entry::{run_entry, Entry, Job};
use crate::{OneShotTask, RecurringTask, Scheduler, TimerKey};

struct State {
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    now: Duration,
}

/// Simulation scheduler: `now` is advanced only by [`VirtualScheduler::advance_to`]
/// (or [`VirtualScheduler::advance_by`]), which pops due entries in
/// `(deadline, submission)` order and runs them on the calling thread.
#[derive(Clone)]
pub struct VirtualScheduler {
    inner: Arc<Mutex<State>>,
}

impl VirtualScheduler {
    /// Creates a scheduler with the virtual clock at zero.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                queue: BinaryHeap::new(),
                next_seq: 0,
                now: Duration::ZERO,
            })),
        }
    }

    /// Advances the virtual clock to `t`, running every entry due on the way
    /// in deterministic order. Entries scheduled by a callback are run in the
    /// same pass when they fall due at or before `t`.
    pub fn advance_to(&self, t: Duration) {
        loop {
            let entry = {
                let mut state = self.inner.lock();
                match state.queue.peek().map(|r| r.0.due) {
                    Some(due) if due <= t => {
                        let Reverse(entry) = state.queue.pop().expect("peeked entry");
                        if entry.due > state.now {
                            state.now = entry.due;
                        }
                        entry
                    }
                    _ => {
                        if t > state.now {
                            state.now = t;
                        }
                        return;
                    }
                }
            };
            // The lock is released while the callback runs, so callbacks may
            // schedule or cancel freely.
            if let Some(rearmed) = run_entry(entry) {
                self.inner.lock().queue.push(Reverse(rearmed));
            }
        }
    }

    /// Advances the virtual clock by `d`.
    pub fn advance_by(&self, d: Duration) {
        let target = self.inner.lock().now + d;
        self.advance_to(target);
    }

    /// Deadline of the earliest pending entry, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.inner.lock().queue.peek().map(|r| r.0.due)
    }

    /// Number of pending entries (cancelled ones included until they reap).
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    fn submit(&self, delay: Duration, job: Job) -> TimerKey {
        let key = TimerKey::new();
        let mut state = self.inner.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay;
        state.queue.push(Reverse(Entry {
            due,
            seq,
            key: key.clone(),
            job,
        }));
        key
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        self.inner.lock().now
    }

    fn once(&self, delay: Duration, task: OneShotTask) -> TimerKey {
        self.submit(delay, Job::Once(Some(task)))
    }

    fn every(&self, interval: Duration, task: RecurringTask) -> TimerKey {
        self.submit(interval, Job::Every { interval, task })
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}
