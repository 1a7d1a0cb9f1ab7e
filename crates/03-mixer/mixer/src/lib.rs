//! Output-strategy engine: the algorithms deciding WHEN a collected request
//! or reply is released toward its next hop.
//!
//! Every strategy runs two mirrored "simplex" sub-engines, one per
//! direction, each guarding its collection with its own lock. Producer
//! threads feed messages in through [`OutputStrategy::add_request`] /
//! [`OutputStrategy::add_reply`]; timer threads trigger policy firings. Both
//! paths serialize on the simplex lock, so pool slot assignment can never
//! interleave and a message is removed and forwarded exactly once.
//!
//! Strategies are built through a compile-time registry ([`StrategyConfig`] →
//! [`build`]); collaborators (outlet, scheduler, randomness, statistics) are
//! injected explicitly via [`Wiring`]; no globals, so live nodes and
//! deterministic simulations share the exact same engine code.

mod batch;
mod config;
mod delay;
mod entropy;
mod no_delay;
mod pool;
mod simplex;
mod stats;

pub use batch::{SynchronousBatch, ThresholdBatch, ThresholdOrTimedBatch, TimedBatch};
pub use config::{build, StrategyConfig, StrategyError};
pub use delay::RandomDelay;
pub use entropy::Entropy;
pub use no_delay::NoDelay;
pub use pool::{CottrellPool, CottrellTimedPool, DynamicPool};
pub use stats::{TallySnapshot, TallyStats};

use std::sync::Arc;
use std::time::Duration;

use message::{Direction, Message};
use parking_lot::Mutex;
use timers::Scheduler;

/// A pluggable output strategy, request/reply symmetric.
///
/// `add_request`/`add_reply` never block indefinitely; they may wait briefly
/// for the simplex lock. A call may trigger an immediate or future release of
/// one or more messages (including the one just added). Oversized messages
/// are a caller contract violation and panic in the message layer, not here.
pub trait OutputStrategy: Send + Sync {
    /// Transitions the strategy into its firing phase (arms recurring
    /// timers). Idempotent.
    fn start(&self);

    /// Accepts one request for eventual release.
    fn add_request(&self, msg: Message);

    /// Accepts one reply for eventual release.
    fn add_reply(&self, msg: Message);

    /// Cooperatively stops recurring timers: each checks the flag after its
    /// next firing and declines to re-arm. Per-message one-shot delays are
    /// left to fire naturally.
    fn shutdown(&self);
}

/// The seam toward the dispatch/routing layer.
///
/// Implemented by whatever forwards released messages onward; also the
/// factory for synthetic filler when a firing must be padded.
pub trait Outlet: Send + Sync {
    /// Forwards a released request toward its next hop or local destination.
    fn put_out_request(&self, msg: Message);

    /// Forwards a released reply toward its next hop or owning channel.
    fn put_out_reply(&self, msg: Message);

    /// Produces a dummy message for `direction`, indistinguishable in size
    /// from a real one.
    fn dummy(&self, direction: Direction) -> Message;

    /// Forwards a released message according to its direction.
    fn put_out(&self, msg: Message) {
        match msg.direction() {
            Direction::Request => self.put_out_request(msg),
            Direction::Reply => self.put_out_reply(msg),
        }
    }
}

/// Optional observer of message flow. The engine works identically with or
/// without one.
pub trait StatsSink: Send + Sync {
    /// A message entered a collection.
    fn accepted(&self, direction: Direction);

    /// A message left a collection toward the outlet after `dwell` time held.
    fn forwarded(&self, direction: Direction, dwell: Duration);
}

/// Collaborators handed to every strategy at construction.
pub struct Wiring {
    pub(crate) outlet: Arc<dyn Outlet>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) entropy: Mutex<Entropy>,
    pub(crate) stats: Option<Arc<dyn StatsSink>>,
}

impl Wiring {
    /// Bundles the outlet, clock and random source a strategy runs against.
    pub fn new(outlet: Arc<dyn Outlet>, scheduler: Arc<dyn Scheduler>, entropy: Entropy) -> Self {
        Self {
            outlet,
            scheduler,
            entropy: Mutex::new(entropy),
            stats: None,
        }
    }

    /// Attaches a statistics observer.
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub(crate) fn note_accepted(&self, direction: Direction) {
        if let Some(stats) = &self.stats {
            stats.accepted(direction);
        }
    }

    pub(crate) fn note_forwarded(&self, direction: Direction, dwell: Duration) {
        if let Some(stats) = &self.stats {
            stats.forwarded(direction, dwell);
        }
    }

    /// Uniform draw of an index in `[0, n)` from the injected random source.
    pub(crate) fn draw(&self, n: usize) -> usize {
        self.entropy.lock().draw(n)
    }
}
