//! Baseline strategy: zero added latency.

use std::sync::Arc;
use std::time::Duration;

use message::Message;

use crate::{OutputStrategy, Wiring};

/// Forwards every message the moment it arrives. The baseline against which
/// the delaying strategies are measured; it adds no anonymity.
pub struct NoDelay {
    wiring: Arc<Wiring>,
}

impl NoDelay {
    pub fn new(wiring: Arc<Wiring>) -> Self {
        Self { wiring }
    }

    fn forward(&self, msg: Message) {
        let direction = msg.direction();
        self.wiring.note_accepted(direction);
        self.wiring.note_forwarded(direction, Duration::ZERO);
        self.wiring.outlet.put_out(msg);
    }
}

impl OutputStrategy for NoDelay {
    fn start(&self) {}

    fn add_request(&self, msg: Message) {
        self.forward(msg);
    }

    fn add_reply(&self, msg: Message) {
        self.forward(msg);
    }

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{req, tag_of, wiring, RecordingOutlet};
    use timers::{Scheduler, VirtualScheduler};

    /// Every message leaves immediately, in call order.
    #[test]
    fn forwards_immediately() {
        let outlet = RecordingOutlet::new();
        let sched: Arc<dyn Scheduler> = Arc::new(VirtualScheduler::new());
        let strategy = NoDelay::new(Arc::new(wiring(outlet.clone(), sched, 1)));

        strategy.add_request(req(1));
        strategy.add_request(req(2));
        let tags: Vec<u8> = outlet.sent().iter().map(tag_of).collect();
        assert_eq!(tags, vec![1, 2]);
    }
}
