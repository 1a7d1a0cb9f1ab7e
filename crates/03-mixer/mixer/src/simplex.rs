//! Shared per-direction collection machinery.
//!
//! A simplex is one direction's pool or batch. Request and reply sides of a
//! strategy are independent simplexes with independent locks; nothing in the
//! engine takes both locks at once.

use std::time::Duration;

use message::{Direction, Message};
use parking_lot::{Mutex, MutexGuard};

use crate::Wiring;

/// A message held in a collection, stamped with its admission time for
/// dwell-time statistics.
pub(crate) struct Held {
    pub msg: Message,
    pub admitted_at: Duration,
}

impl Held {
    pub fn new(msg: Message, admitted_at: Duration) -> Self {
        Self { msg, admitted_at }
    }
}

/// One direction's collection.
pub(crate) struct Simplex {
    pub direction: Direction,
    held: Mutex<Vec<Held>>,
}

impl Simplex {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            held: Mutex::new(Vec::new()),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Vec<Held>> {
        self.held.lock()
    }
}

/// Forwards a drained batch to the outlet, oldest first, recording dwell
/// times. Called with no simplex lock held so a blocked outlet never stalls
/// producers.
pub(crate) fn release(wiring: &Wiring, batch: Vec<Held>) {
    if batch.is_empty() {
        return;
    }
    let now = wiring.scheduler.now();
    for held in batch {
        wiring.note_forwarded(held.msg.direction(), now.saturating_sub(held.admitted_at));
        wiring.outlet.put_out(held.msg);
    }
}

/// Removes `count` messages from `held`, each chosen uniformly at random
/// without replacement. Caller still holds the simplex lock; the draw happens
/// inside it so slot assignment cannot interleave with adds.
pub(crate) fn draw_out(wiring: &Wiring, held: &mut Vec<Held>, count: usize) -> Vec<Held> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let i = wiring.draw(held.len());
        out.push(held.swap_remove(i));
    }
    out
}
