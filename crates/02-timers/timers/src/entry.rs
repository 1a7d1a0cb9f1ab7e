use std::cmp::Ordering;
use std::time::Duration;

use crate::{OneShotTask, RecurringTask, Repeat, TimerKey};

pub(crate) enum Job {
    Once(Option<OneShotTask>),
    Every {
        interval: Duration,
        task: RecurringTask,
    },
}

pub(crate) struct Entry {
    pub due: Duration,
    pub seq: u64,
    pub key: TimerKey,
    pub job: Job,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal deadlines break ties by submission order (FIFO).
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

/// Runs a due entry without any scheduler lock held. Returns the entry
/// re-armed for its next deadline when it should fire again.
pub(crate) fn run_entry(mut entry: Entry) -> Option<Entry> {
    if entry.key.is_cancelled() {
        return None;
    }
    match entry.job {
        Job::Once(ref mut slot) => {
            if let Some(task) = slot.take() {
                task();
            }
            None
        }
        Job::Every {
            interval,
            ref mut task,
        } => match task() {
            Repeat::Continue if !entry.key.is_cancelled() => {
                entry.due += interval;
                Some(entry)
            }
            _ => None,
        },
    }
}
