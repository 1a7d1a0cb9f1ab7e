//! Independent uniform random delay per message.

use std::sync::Arc;
use std::time::Duration;

use message::Message;

use crate::{OutputStrategy, Wiring};

/// Delays every message independently by a uniform draw in `[0, max_delay]`
/// via its own one-shot timer. There is no shared pool, so there is nothing
/// to lock and nothing to flush: pending one-shots fire naturally even after
/// shutdown.
pub struct RandomDelay {
    wiring: Arc<Wiring>,
    max_delay: Duration,
}

impl RandomDelay {
    pub fn new(max_delay: Duration, wiring: Arc<Wiring>) -> Self {
        Self { wiring, max_delay }
    }

    fn add(&self, msg: Message) {
        let direction = msg.direction();
        self.wiring.note_accepted(direction);
        let delay = self.wiring.entropy.lock().delay_within(self.max_delay);
        let wiring = Arc::clone(&self.wiring);
        self.wiring.scheduler.once(
            delay,
            Box::new(move || {
                wiring.note_forwarded(direction, delay);
                wiring.outlet.put_out(msg);
            }),
        );
    }
}

impl OutputStrategy for RandomDelay {
    fn start(&self) {}

    fn add_request(&self, msg: Message) {
        self.add(msg);
    }

    fn add_reply(&self, msg: Message) {
        self.add(msg);
    }

    fn shutdown(&self) {}
}
