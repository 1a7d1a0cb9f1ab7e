//! Pool strategies: hold a reservoir of messages and release uniformly drawn
//! members. Pools intentionally make no ordering guarantee: the
//! randomization is the anonymity.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use message::{Direction, Message};
use timers::Repeat;

use crate::simplex::{draw_out, release, Held, Simplex};
use crate::{OutputStrategy, Wiring};

/// Constant-size pool: once warm, every arrival triggers exactly one uniform
/// draw over the `pool_size` pooled messages plus the newcomer. If the
/// newcomer is drawn it is forwarded without ever entering the pool;
/// otherwise the drawn message leaves and the newcomer takes its slot.
pub struct CottrellPool {
    wiring: Arc<Wiring>,
    pool_size: usize,
    request: Simplex,
    reply: Simplex,
}

impl CottrellPool {
    pub fn new(pool_size: usize, wiring: Arc<Wiring>) -> Self {
        Self {
            wiring,
            pool_size,
            request: Simplex::new(Direction::Request),
            reply: Simplex::new(Direction::Reply),
        }
    }

    fn add(&self, simplex: &Simplex, msg: Message) {
        self.wiring.note_accepted(simplex.direction);
        let now = self.wiring.scheduler.now();
        let victim = {
            let mut held = simplex.lock();
            if held.len() < self.pool_size {
                held.push(Held::new(msg, now));
                None
            } else {
                // One draw over pool_size + 1 candidates: the pool plus the
                // newcomer, which occupies the last index.
                let i = self.wiring.draw(self.pool_size + 1);
                if i == self.pool_size {
                    Some(Held::new(msg, now))
                } else {
                    Some(mem::replace(&mut held[i], Held::new(msg, now)))
                }
            }
        };
        if let Some(victim) = victim {
            release(&self.wiring, vec![victim]);
        }
    }
}

impl OutputStrategy for CottrellPool {
    fn start(&self) {}

    fn add_request(&self, msg: Message) {
        self.add(&self.request, msg);
    }

    fn add_reply(&self, msg: Message) {
        self.add(&self.reply, msg);
    }

    fn shutdown(&self) {}
}

/// Timed pool: every `sending_rate`, everything beyond `pool_size` leaves,
/// drawn uniformly without replacement. Between ticks the pool may exceed
/// `pool_size`; it trends back at each firing.
pub struct CottrellTimedPool {
    wiring: Arc<Wiring>,
    pool_size: usize,
    sending_rate: Duration,
    stop: Arc<AtomicBool>,
    armed: AtomicBool,
    request: Arc<Simplex>,
    reply: Arc<Simplex>,
}

impl CottrellTimedPool {
    pub fn new(pool_size: usize, sending_rate: Duration, wiring: Arc<Wiring>) -> Self {
        Self {
            wiring,
            pool_size,
            sending_rate,
            stop: Arc::new(AtomicBool::new(false)),
            armed: AtomicBool::new(false),
            request: Arc::new(Simplex::new(Direction::Request)),
            reply: Arc::new(Simplex::new(Direction::Reply)),
        }
    }

    fn add(&self, simplex: &Simplex, msg: Message) {
        self.wiring.note_accepted(simplex.direction);
        simplex
            .lock()
            .push(Held::new(msg, self.wiring.scheduler.now()));
    }
}

impl OutputStrategy for CottrellTimedPool {
    fn start(&self) {
        if !self.armed.swap(true, Ordering::AcqRel) {
            let pool_size = self.pool_size;
            for simplex in [&self.request, &self.reply] {
                arm_timed_drain(
                    &self.wiring,
                    simplex,
                    &self.stop,
                    self.sending_rate,
                    move |len| len.saturating_sub(pool_size),
                );
            }
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

/// Generalized timed pool: a tick fires only while the pool holds more than
/// `min_messages`, releasing `floor(fraction * (len - min_messages))`
/// uniformly drawn messages. With `fraction = 1` this degenerates to
/// [`CottrellTimedPool`] with `min_messages` as the pool size.
pub struct DynamicPool {
    wiring: Arc<Wiring>,
    sending_rate: Duration,
    min_messages: usize,
    fraction: f64,
    stop: Arc<AtomicBool>,
    armed: AtomicBool,
    request: Arc<Simplex>,
    reply: Arc<Simplex>,
}

impl DynamicPool {
    pub fn new(
        sending_rate: Duration,
        min_messages: usize,
        fraction: f64,
        wiring: Arc<Wiring>,
    ) -> Self {
        Self {
            wiring,
            sending_rate,
            min_messages,
            fraction,
            stop: Arc::new(AtomicBool::new(false)),
            armed: AtomicBool::new(false),
            request: Arc::new(Simplex::new(Direction::Request)),
            reply: Arc::new(Simplex::new(Direction::Reply)),
        }
    }

    fn add(&self, simplex: &Simplex, msg: Message) {
        self.wiring.note_accepted(simplex.direction);
        simplex
            .lock()
            .push(Held::new(msg, self.wiring.scheduler.now()));
    }
}

impl OutputStrategy for DynamicPool {
    fn start(&self) {
        if !self.armed.swap(true, Ordering::AcqRel) {
            let min_messages = self.min_messages;
            let fraction = self.fraction;
            for simplex in [&self.request, &self.reply] {
                arm_timed_drain(
                    &self.wiring,
                    simplex,
                    &self.stop,
                    self.sending_rate,
                    move |len| {
                        if len > min_messages {
                            ((len - min_messages) as f64 * fraction).floor() as usize
                        } else {
                            0
                        }
                    },
                );
            }
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

fn arm_timed_drain(
    wiring: &Arc<Wiring>,
    simplex: &Arc<Simplex>,
    stop: &Arc<AtomicBool>,
    interval: Duration,
    excess: impl Fn(usize) -> usize + Send + 'static,
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
            let victims = {
                let mut held = simplex.lock();
                let count = excess(held.len());
                draw_out(&w, &mut held, count)
            };
            release(&w, victims);
            Repeat::Continue
        }),
    );
}
