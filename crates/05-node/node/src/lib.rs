//! Node orchestration: wires the message model, timer substrate, output
//! strategy and routing layer into a running mix (or client) process.
//!
//! Construction is a guarded three-phase lifecycle rather than call-order
//! convention: [`MixNode::new`] validates configuration (`Created`),
//! [`MixNode::initialize`] wires collaborators (`Initialized`), and
//! [`MixNode::begin`] starts firing (`Running`). Out-of-order calls are typed
//! errors. Collaborators (scheduler, randomness, statistics) are injected
//! explicitly, so a live node (wall clock, OS entropy) and a simulation run
//! (virtual clock, fixed seed) execute identical code.

mod config;

pub use config::{CascadePosition, NodeConfig};

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use log::{debug, info};
use thiserror::Error;

use message::{ChannelId, ChannelTable, Direction, Header, Message};
use mixer::{Entropy, Outlet, OutputStrategy, StatsSink, StrategyError, Wiring};
use routing::{
    OutboundFrame, Router, RouterConfig, RouterMetricsSnapshot, RoutingError, RoutingMode,
};
use timers::{Scheduler, WallScheduler};

/// Lifecycle phase of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Configuration accepted, nothing wired yet.
    Created,
    /// Collaborators wired, timers not yet armed.
    Initialized,
    /// Accepting traffic and firing.
    Running,
    /// Cooperatively stopped.
    Stopped,
}

/// Node-level errors. Configuration problems are fatal at construction; the
/// lifecycle variants guard call order.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid strategy configuration: {0}")]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("{operation} requires phase {expected:?}, node is {found:?}")]
    Phase {
        operation: &'static str,
        expected: Phase,
        found: Phase,
    },

    #[error("cascade position {position} outside cascade of length {length}")]
    CascadeOutOfRange { position: usize, length: usize },

    #[error("request transfer unit of {0} bytes cannot hold the routing header")]
    RequestUnitTooSmall(usize),

    #[error("{0} capacity must be positive")]
    ZeroCapacity(&'static str),
}

/// A mix node: the orchestration shell around one output strategy, one
/// router, and the bounded queues between them and the outside.
pub struct MixNode {
    config: NodeConfig,
    phase: Phase,
    channels: Arc<ChannelTable>,
    scheduler_override: Option<Arc<dyn Scheduler>>,
    stats: Option<Arc<dyn StatsSink>>,
    wall: Option<Arc<WallScheduler>>,
    router: Option<Arc<Router>>,
    strategy: Option<Arc<dyn OutputStrategy>>,
    outbound: Option<Receiver<OutboundFrame>>,
}

impl fmt::Debug for MixNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixNode")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl MixNode {
    /// Validates `config` and creates a node in the `Created` phase. All
    /// fatal configuration errors surface here, before any thread or queue
    /// exists.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.strategy.validate()?;
        if let Some(CascadePosition { position, length }) = config.cascade {
            if length == 0 || position >= length {
                return Err(NodeError::CascadeOutOfRange { position, length });
            }
        }
        let header_len = Header::PORT_LEN
            + if config.with_pseudonym {
                Header::PSEUDONYM_LEN
            } else {
                0
            };
        if config.request_size < header_len {
            return Err(NodeError::RequestUnitTooSmall(config.request_size));
        }
        if config.queue_capacity == 0 {
            return Err(NodeError::ZeroCapacity("outbound queue"));
        }
        if config.delivery_capacity == 0 {
            return Err(NodeError::ZeroCapacity("delivery queue"));
        }
        Ok(Self {
            config,
            phase: Phase::Created,
            channels: Arc::new(ChannelTable::new()),
            scheduler_override: None,
            stats: None,
            wall: None,
            router: None,
            strategy: None,
            outbound: None,
        })
    }

    /// Injects a scheduler, typically a virtual clock for simulation runs.
    /// Without
    /// this, `initialize` starts a wall-clock timer thread.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler_override = Some(scheduler);
        self
    }

    /// Attaches a statistics observer. The node works identically without
    /// one.
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Wires collaborators: router, entropy, strategy. `Created →
    /// Initialized`.
    pub fn initialize(&mut self) -> Result<(), NodeError> {
        self.expect_phase("initialize", Phase::Created)?;

        let scheduler: Arc<dyn Scheduler> = match &self.scheduler_override {
            Some(scheduler) => Arc::clone(scheduler),
            None => {
                let wall = Arc::new(WallScheduler::new());
                self.wall = Some(Arc::clone(&wall));
                wall
            }
        };

        let mode = match self.config.cascade {
            Some(CascadePosition { position, length }) => RoutingMode::Cascade { position, length },
            None => RoutingMode::FreeRoute,
        };
        let (router, outbound) = Router::new(
            RouterConfig {
                mode,
                limits: self.config.limits(),
                with_pseudonym: self.config.with_pseudonym,
                queue_capacity: self.config.queue_capacity,
                port_capacity: self.config.delivery_capacity,
            },
            Arc::clone(&self.channels),
        );

        let entropy = match self.config.seed {
            Some(seed) => Entropy::seeded(seed),
            None => Entropy::strong(),
        };
        let outlet: Arc<dyn Outlet> = router.clone();
        let mut wiring = Wiring::new(outlet, scheduler, entropy);
        if let Some(stats) = &self.stats {
            wiring = wiring.with_stats(Arc::clone(stats));
        }
        let strategy = mixer::build(&self.config.strategy, wiring)?;

        self.router = Some(router);
        self.strategy = Some(strategy);
        self.outbound = Some(outbound);
        self.phase = Phase::Initialized;
        debug!("node initialized");
        Ok(())
    }

    /// Starts the firing phase. `Initialized → Running`.
    pub fn begin(&mut self) -> Result<(), NodeError> {
        self.expect_phase("begin", Phase::Initialized)?;
        self.strategy().start();
        self.phase = Phase::Running;
        info!("node running");
        Ok(())
    }

    /// Inbound seam: the recoding layer hands over an authenticated, decoded
    /// request.
    pub fn add_request(&self, msg: Message) -> Result<(), NodeError> {
        self.expect_phase("add_request", Phase::Running)?;
        self.channels.touch(msg.channel());
        self.strategy().add_request(msg);
        Ok(())
    }

    /// Inbound seam for replies.
    pub fn add_reply(&self, msg: Message) -> Result<(), NodeError> {
        self.expect_phase("add_reply", Phase::Running)?;
        self.channels.touch(msg.channel());
        self.strategy().add_reply(msg);
        Ok(())
    }

    /// Opens a local connection; replies owned by the returned id land on the
    /// receiver.
    pub fn open_channel(&self) -> (ChannelId, Receiver<Vec<u8>>) {
        self.channels.open(self.config.delivery_capacity)
    }

    /// Closes a local connection; returns whether it was open.
    pub fn close_channel(&self, id: ChannelId) -> bool {
        self.channels.close(id)
    }

    /// Binds a terminating local socket. Available once initialized.
    pub fn register_port(&self, port: u16) -> Result<Receiver<Vec<u8>>, NodeError> {
        let Some(router) = &self.router else {
            return Err(NodeError::Phase {
                operation: "register_port",
                expected: Phase::Initialized,
                found: self.phase,
            });
        };
        Ok(router.register_port(port)?)
    }

    /// Hands the outbound inter-mix queue to the network-transport layer.
    /// Yields `None` after the first call.
    pub fn take_outbound(&mut self) -> Option<Receiver<OutboundFrame>> {
        self.outbound.take()
    }

    /// Maximum permissible size of the next outgoing unit in `direction`.
    pub fn max_next_size(&self, direction: Direction) -> usize {
        self.config.limits().max_size(direction)
    }

    /// Router counters, once initialized.
    pub fn metrics(&self) -> Option<RouterMetricsSnapshot> {
        self.router.as_ref().map(|router| router.metrics())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stops the node: recurring timers decline their next re-arm, then the
    /// wall-clock timer thread (when the node owns one) is joined.
    /// `Running → Stopped`.
    pub fn shutdown(&mut self) -> Result<(), NodeError> {
        self.expect_phase("shutdown", Phase::Running)?;
        self.strategy().shutdown();
        if let Some(wall) = &self.wall {
            wall.shutdown();
        }
        self.phase = Phase::Stopped;
        info!("node stopped");
        Ok(())
    }

    fn strategy(&self) -> &Arc<dyn OutputStrategy> {
        self.strategy.as_ref().expect("phase guards initialization")
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<(), NodeError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(NodeError::Phase {
                operation,
                expected,
                found: self.phase,
            })
        }
    }
}
