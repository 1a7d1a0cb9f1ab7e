//! Batch strategies: release the whole collection when a size or time
//! condition is met. Within one firing, messages leave in arrival order, so a
//! given input sequence replays deterministically.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use message::{Direction, Message};
use timers::Repeat;

use crate::simplex::{release, Held, Simplex};
use crate::{OutputStrategy, Wiring};

/// Fires when the collection reaches a fixed size; forwards the whole batch
/// and resets the slot counter.
pub struct SynchronousBatch {
    wiring: Arc<Wiring>,
    batch_size: usize,
    request: Simplex,
    reply: Simplex,
}

impl SynchronousBatch {
    pub fn new(batch_size: usize, wiring: Arc<Wiring>) -> Self {
        Self {
            wiring,
            batch_size,
            request: Simplex::new(Direction::Request),
            reply: Simplex::new(Direction::Reply),
        }
    }

    fn add(&self, simplex: &Simplex, msg: Message) {
        self.wiring.note_accepted(simplex.direction);
        let batch = {
            let mut held = simplex.lock();
            held.push(Held::new(msg, self.wiring.scheduler.now()));
            if held.len() >= self.batch_size {
                mem::take(&mut *held)
            } else {
                Vec::new()
            }
        };
        release(&self.wiring, batch);
    }
}

impl OutputStrategy for SynchronousBatch {
    fn start(&self) {}

    fn add_request(&self, msg: Message) {
        self.add(&self.request, msg);
    }

    fn add_reply(&self, msg: Message) {
        self.add(&self.reply, msg);
    }

    fn shutdown(&self) {}
}

/// Fires every `sending_rate`; the recurring timer is armed by the first
/// message of each direction. The collection is cleared and replaced at each
/// firing; the timer keeps running until the stop flag is set.
pub struct TimedBatch {
    wiring: Arc<Wiring>,
    sending_rate: Duration,
    stop: Arc<AtomicBool>,
    request: TimedSide,
    reply: TimedSide,
}

struct TimedSide {
    simplex: Arc<Simplex>,
    armed: AtomicBool,
}

impl TimedSide {
    fn new(direction: Direction) -> Self {
        Self {
            simplex: Arc::new(Simplex::new(direction)),
            armed: AtomicBool::new(false),
        }
    }
}

impl TimedBatch {
    pub fn new(sending_rate: Duration, wiring: Arc<Wiring>) -> Self {
        Self {
            wiring,
            sending_rate,
            stop: Arc::new(AtomicBool::new(false)),
            request: TimedSide::new(Direction::Request),
            reply: TimedSide::new(Direction::Reply),
        }
    }

    fn add(&self, side: &TimedSide, msg: Message) {
        self.wiring.note_accepted(side.simplex.direction);
        side.simplex
            .lock()
            .push(Held::new(msg, self.wiring.scheduler.now()));
        if !side.armed.swap(true, Ordering::AcqRel) {
            arm_drain_all(&self.wiring, &side.simplex, &self.stop, self.sending_rate);
        }
    }
}

impl OutputStrategy for TimedBatch {
    fn start(&self) {}

    fn add_request(&self, msg: Message) {
        self.add(&self.request, msg);
    }

    fn add_reply(&self, msg: Message) {
        self.add(&self.reply, msg);
    }

    fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Classic threshold pool: when the collection reaches `threshold = n + f`,
/// the `n` oldest messages leave and `f` stay, so the pool never fully
/// empties.
pub struct ThresholdBatch {
    wiring: Arc<Wiring>,
    threshold: usize,
    pool_size: usize,
    request: Simplex,
    reply: Simplex,
}

impl ThresholdBatch {
    pub fn new(threshold: usize, pool_size: usize, wiring: Arc<Wiring>) -> Self {
        Self {
            wiring,
            threshold,
            pool_size,
            request: Simplex::new(Direction::Request),
            reply: Simplex::new(Direction::Reply),
        }
    }

    fn add(&self, simplex: &Simplex, msg: Message) {
        self.wiring.note_accepted(simplex.direction);
        let batch = {
            let mut held = simplex.lock();
            held.push(Held::new(msg, self.wiring.scheduler.now()));
            if held.len() >= self.threshold {
                held.drain(..self.threshold - self.pool_size).collect()
            } else {
                Vec::new()
            }
        };
        release(&self.wiring, batch);
    }
}

impl OutputStrategy for ThresholdBatch {
    fn start(&self) {}

    fn add_request(&self, msg: Message) {
        self.add(&self.request, msg);
    }

    fn add_reply(&self, msg: Message) {
        self.add(&self.reply, msg);
    }

    fn shutdown(&self) {}
}

/// Fires on whichever comes first: the collection reaching `batch_size`, or
/// the recurring tick. The size trigger fires at `len >= batch_size`; a tick
/// releases whatever is collected, padded with dummies up to `batch_size` so
/// a tick firing is size-invariant to an observer. An empty tick emits
/// nothing. The two triggers are independent: a size firing does not re-phase
/// the timer.
pub struct ThresholdOrTimedBatch {
    wiring: Arc<Wiring>,
    batch_size: usize,
    sending_rate: Duration,
    stop: Arc<AtomicBool>,
    armed: AtomicBool,
    request: Arc<Simplex>,
    reply: Arc<Simplex>,
}

impl ThresholdOrTimedBatch {
    pub fn new(batch_size: usize, sending_rate: Duration, wiring: Arc<Wiring>) -> Self {
        Self {
            wiring,
            batch_size,
            sending_rate,
            stop: Arc::new(AtomicBool::new(false)),
            armed: AtomicBool::new(false),
            request: Arc::new(Simplex::new(Direction::Request)),
            reply: Arc::new(Simplex::new(Direction::Reply)),
        }
    }

    fn add(&self, simplex: &Simplex, msg: Message) {
        self.wiring.note_accepted(simplex.direction);
        let batch = {
            let mut held = simplex.lock();
            held.push(Held::new(msg, self.wiring.scheduler.now()));
            if held.len() >= self.batch_size {
                mem::take(&mut *held)
            } else {
                Vec::new()
            }
        };
        release(&self.wiring, batch);
    }

    fn arm(&self, simplex: &Arc<Simplex>) {
        let wiring = Arc::clone(&self.wiring);
        let simplex = Arc::clone(simplex);
        let stop = Arc::clone(&self.stop);
        let batch_size = self.batch_size;
        self.wiring.scheduler.every(
            self.sending_rate,
            Box::new(move || {
                if stop.load(Ordering::Acquire) {
                    return Repeat::Stop;
                }
                let batch = mem::take(&mut *simplex.lock());
                if batch.is_empty() {
                    return Repeat::Continue;
                }
                let missing = batch_size.saturating_sub(batch.len());
                let direction = simplex.direction;
                release(&wiring, batch);
                for _ in 0..missing {
                    let dummy = wiring.outlet.dummy(direction);
                    wiring.outlet.put_out(dummy);
                }
                Repeat::Continue
            }),
        );
    }
}

impl OutputStrategy for ThresholdOrTimedBatch {
    fn start(&self) {
        if !self.armed.swap(true, Ordering::AcqRel) {
            self.arm(&self.request);
            self.arm(&self.reply);
        }
    }

    fn add_request(&self, msg: Message) {
        self.add(&self.request, msg);
    }

    fn add_reply(&self, msg: Message) {
        self.add(&self.reply, msg);
    }

    fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn arm_drain_all(
    wiring: &Arc<Wiring>,
    simplex: &Arc<Simplex>,
    stop: &Arc<AtomicBool>,
    interval: Duration,
) {
    let w = Arc::clone(wiring);
    let simplex = Arc::clone(simplex);
    let stop = Arc::clone(stop);
    wiring.scheduler.every(
        interval,
        Box::new(move || {
            if stop.load(Ordering::Acquire) {
                return Repeat::Stop;
            }
            let batch = mem::take(&mut *simplex.lock());
            release(&w, batch);
            Repeat::Continue
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{rep, req, tag_of, wiring, RecordingOutlet};
    use timers::{Scheduler, VirtualScheduler};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tags(outlet: &RecordingOutlet) -> Vec<u8> {
        outlet.sent().iter().map(tag_of).collect()
    }

    /// Scenario: batch size 3. Two messages stay collected, the third
    /// releases all three in arrival order, and the collection resets.
    #[test]
    fn synchronous_batch_fires_exactly_at_size() {
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(VirtualScheduler::new());
        let strategy = SynchronousBatch::new(3, Arc::new(wiring(outlet.clone(), sched, 1)));

        strategy.add_request(req(1));
        strategy.add_request(req(2));
        assert_eq!(outlet.count(), 0);

        strategy.add_request(req(3));
        assert_eq!(tags(&outlet), vec![1, 2, 3]);

        strategy.add_request(req(4));
        strategy.add_request(req(5));
        assert_eq!(outlet.count(), 3);
    }

    /// Request and reply collections are independent: replies never count
    /// toward the request batch.
    #[test]
    fn synchronous_batch_directions_are_independent() {
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(VirtualScheduler::new());
        let strategy = SynchronousBatch::new(2, Arc::new(wiring(outlet.clone(), sched, 1)));

        strategy.add_request(req(1));
        strategy.add_reply(rep(10));
        assert_eq!(outlet.count(), 0);

        strategy.add_reply(rep(11));
        assert_eq!(tags(&outlet), vec![10, 11]);

        strategy.add_request(req(2));
        assert_eq!(tags(&outlet), vec![10, 11, 1, 2]);
    }

    /// Scenario: `pool_size = 2`, `threshold = 5`. The fifth message releases
    /// exactly the three oldest, two stay behind for the next round.
    #[test]
    fn threshold_batch_keeps_pool_size_messages() {
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(VirtualScheduler::new());
        let strategy = ThresholdBatch::new(5, 2, Arc::new(wiring(outlet.clone(), sched, 1)));

        for t in 1..=4 {
            strategy.add_request(req(t));
        }
        assert_eq!(outlet.count(), 0);

        strategy.add_request(req(5));
        assert_eq!(tags(&outlet), vec![1, 2, 3]);

        // The survivors (4, 5) head the next firing.
        strategy.add_request(req(6));
        strategy.add_request(req(7));
        assert_eq!(outlet.count(), 3);
        strategy.add_request(req(8));
        assert_eq!(tags(&outlet), vec![1, 2, 3, 4, 5, 6]);
    }

    /// Messages added between tick `k` and `k+1` are all and only forwarded at
    /// tick `k+1`; the timer is armed by the first message, not at start.
    #[test]
    fn timed_batch_releases_per_tick() {
        let sim = VirtualScheduler::new();
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(sim.clone());
        let strategy = TimedBatch::new(ms(100), Arc::new(wiring(outlet.clone(), sched, 1)));

        sim.advance_to(ms(250));
        assert_eq!(sim.pending(), 0);

        strategy.add_request(req(1));
        strategy.add_request(req(2));
        sim.advance_to(ms(349));
        assert_eq!(outlet.count(), 0);
        sim.advance_to(ms(350));
        assert_eq!(tags(&outlet), vec![1, 2]);

        strategy.add_request(req(3));
        sim.advance_to(ms(450));
        assert_eq!(tags(&outlet), vec![1, 2, 3]);

        // An idle tick forwards nothing.
        sim.advance_to(ms(650));
        assert_eq!(outlet.count(), 3);
    }

    /// After shutdown the recurring timer declines to re-arm and held
    /// messages stay held.
    #[test]
    fn timed_batch_stops_cooperatively() {
        let sim = VirtualScheduler::new();
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(sim.clone());
        let strategy = TimedBatch::new(ms(100), Arc::new(wiring(outlet.clone(), sched, 1)));

        strategy.add_request(req(1));
        sim.advance_to(ms(100));
        assert_eq!(outlet.count(), 1);

        strategy.shutdown();
        strategy.add_request(req(2));
        sim.advance_to(ms(500));
        assert_eq!(outlet.count(), 1);
        assert_eq!(sim.pending(), 0);
    }

    /// The size trigger releases a full batch immediately, without dummies.
    #[test]
    fn threshold_or_timed_size_trigger() {
        let sim = VirtualScheduler::new();
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(sim.clone());
        let strategy =
            ThresholdOrTimedBatch::new(3, ms(100), Arc::new(wiring(outlet.clone(), sched, 1)));
        strategy.start();

        strategy.add_request(req(1));
        strategy.add_request(req(2));
        assert_eq!(outlet.count(), 0);
        strategy.add_request(req(3));
        assert_eq!(tags(&outlet), vec![1, 2, 3]);
        assert_eq!(outlet.dummies_made(), 0);
    }

    /// A timer tick with a short collection pads to the batch size with
    /// dummies; an empty tick emits nothing at all.
    #[test]
    fn threshold_or_timed_tick_pads_with_dummies() {
        let sim = VirtualScheduler::new();
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(sim.clone());
        let strategy =
            ThresholdOrTimedBatch::new(3, ms(100), Arc::new(wiring(outlet.clone(), sched, 1)));
        strategy.start();

        strategy.add_request(req(1));
        sim.advance_to(ms(100));
        assert_eq!(outlet.count(), 3);
        assert_eq!(outlet.dummies_made(), 2);
        assert_eq!(tag_of(&outlet.sent()[0]), 1);

        sim.advance_to(ms(400));
        assert_eq!(outlet.count(), 3);
        assert_eq!(outlet.dummies_made(), 2);
    }
}
