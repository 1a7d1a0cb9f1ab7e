//! Wall-clock scheduler backed by a dedicated timer thread.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::entry::{run_entry, Entry, Job};
use crate::{OneShotTask, RecurringTask, Scheduler, TimerKey};

struct State {
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    shutdown: bool,
}

struct Inner {
    start: Instant,
    state: Mutex<State>,
    cond: Condvar,
}

/// Live-deployment scheduler: a single timer thread sleeps until the earliest
/// pending deadline and runs callbacks with no scheduler lock held.
pub struct WallScheduler {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WallScheduler {
    /// Starts the timer thread.
    pub fn new() -> Self {
        let inner = Arc::new(Inner {
            start: Instant::now(),
            state: Mutex::new(State {
                queue: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });
        let worker = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("wall-timers".into())
                .spawn(move || run(inner))
                .expect("spawn timer thread")
        };
        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Stops the timer thread after any callback in flight finishes. Pending
    /// entries never fire. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.inner.cond.notify_all();
        if let Some(handle) = self.worker.lock().take() {
            // Never join from a timer callback; the flag alone stops the loop.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        debug!("wall scheduler stopped");
    }

    fn submit(&self, delay: Duration, job: Job) -> TimerKey {
        let key = TimerKey::new();
        {
            let mut state = self.inner.state.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(Reverse(Entry {
                due: self.inner.start.elapsed() + delay,
                seq,
                key: key.clone(),
                job,
            }));
        }
        self.inner.cond.notify_all();
        key
    }
}

impl Scheduler for WallScheduler {
    fn now(&self) -> Duration {
        self.inner.start.elapsed()
    }

    fn once(&self, delay: Duration, task: OneShotTask) -> TimerKey {
        self.submit(delay, Job::Once(Some(task)))
    }

    fn every(&self, interval: Duration, task: RecurringTask) -> TimerKey {
        self.submit(interval, Job::Every { interval, task })
    }
}

impl Default for WallScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WallScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(inner: Arc<Inner>) {
    let mut state = inner.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        let now = inner.start.elapsed();
        let next_due = state.queue.peek().map(|r| r.0.due);
        match next_due {
            Some(due) if due <= now => {
                let Reverse(entry) = state.queue.pop().expect("peeked entry");
                drop(state);
                let rearmed = run_entry(entry);
                state = inner.state.lock();
                if let Some(entry) = rearmed {
                    state.queue.push(Reverse(entry));
                }
            }
            Some(due) => {
                let deadline = inner.start + due;
                inner.cond.wait_until(&mut state, deadline);
            }
            None => {
                inner.cond.wait(&mut state);
            }
        }
    }
}
