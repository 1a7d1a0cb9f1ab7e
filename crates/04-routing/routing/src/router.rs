//! Route resolution and per-hop dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::warn;
use parking_lot::RwLock;

use message::{
    ChannelId, ChannelTable, Direction, Header, Limits, Message, MixRef, Route, DISCARD_PORT,
};
use mixer::Outlet;

use crate::error::{RoutingError, RoutingResult};
use crate::metrics::RouterMetrics;
use crate::RouterMetricsSnapshot;

/// How this node decides its position in a message's route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutingMode {
    /// Fixed, globally known ordered mix list; this node sits at `position`
    /// of `length`. Requests travel toward the last mix, replies back toward
    /// the first.
    Cascade {
        /// This node's index in the cascade, starting at 0.
        position: usize,
        /// Total number of mixes in the cascade.
        length: usize,
    },
    /// Each message carries its own hop list; an exhausted list is the
    /// "deliver locally" sentinel.
    FreeRoute,
}

enum Resolution {
    Forward(MixRef),
    Deliver,
}

impl RoutingMode {
    fn resolve(&self, msg: &Message) -> Resolution {
        match *self {
            RoutingMode::Cascade { position, length } => match msg.direction() {
                Direction::Request if position + 1 < length => {
                    Resolution::Forward(MixRef((position + 1) as u16))
                }
                Direction::Reply if position > 0 => {
                    Resolution::Forward(MixRef((position - 1) as u16))
                }
                _ => Resolution::Deliver,
            },
            RoutingMode::FreeRoute => match msg.route() {
                Route::Hops(hops) if !hops.is_empty() => Resolution::Forward(hops[0]),
                _ => Resolution::Deliver,
            },
        }
    }
}

/// A message on its way to another mix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    /// The mix the transport layer should hand the message to.
    pub next_hop: MixRef,
    /// The message itself, still fully formed.
    pub message: Message,
}

/// Configuration of the dispatch layer.
#[derive(Clone, Copy, Debug)]
pub struct RouterConfig {
    pub mode: RoutingMode,
    pub limits: Limits,
    /// Whether final-hop request headers carry the 4-byte pseudonym.
    pub with_pseudonym: bool,
    /// Capacity of the outbound inter-mix queue.
    pub queue_capacity: usize,
    /// Capacity of each local port's delivery queue.
    pub port_capacity: usize,
}

/// The dispatch layer: implements the strategy's [`Outlet`] seam and routes
/// each released message onward or into a local destination.
pub struct Router {
    config: RouterConfig,
    outbound: Sender<OutboundFrame>,
    ports: RwLock<HashMap<u16, Sender<Vec<u8>>>>,
    channels: Arc<ChannelTable>,
    metrics: RouterMetrics,
}

impl Router {
    /// Builds the router plus the receiving end of the outbound queue, which
    /// the (external) network-transport layer drains.
    pub fn new(config: RouterConfig, channels: Arc<ChannelTable>) -> (Arc<Self>, Receiver<OutboundFrame>) {
        let (outbound, outbound_rx) = bounded(config.queue_capacity);
        let router = Arc::new(Self {
            config,
            outbound,
            ports: RwLock::new(HashMap::new()),
            channels,
            metrics: RouterMetrics::default(),
        });
        (router, outbound_rx)
    }

    /// Binds a terminating local socket to `port`.
    pub fn register_port(&self, port: u16) -> RoutingResult<Receiver<Vec<u8>>> {
        if port == DISCARD_PORT {
            return Err(RoutingError::PortReserved(port));
        }
        let mut ports = self.ports.write();
        if ports.contains_key(&port) {
            return Err(RoutingError::PortAlreadyBound(port));
        }
        let (tx, rx) = bounded(self.config.port_capacity);
        ports.insert(port, tx);
        Ok(rx)
    }

    /// Unbinds a local port; returns whether it was bound.
    pub fn unregister_port(&self, port: u16) -> bool {
        self.ports.write().remove(&port).is_some()
    }

    /// Point-in-time view of the router's counters.
    pub fn metrics(&self) -> RouterMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn forward(&self, next_hop: MixRef, message: Message) {
        // Blocking send: a full queue exerts back-pressure on the firing
        // thread rather than dropping or buffering past the timing policy.
        if self.outbound.send(OutboundFrame { next_hop, message }).is_err() {
            warn!("outbound queue closed; frame abandoned during shutdown");
            self.metrics.record_dropped();
            return;
        }
        self.metrics.record_forwarded();
    }

    fn deliver_request(&self, msg: Message) {
        let (header, body) = match Header::strip(msg.payload(), self.config.with_pseudonym) {
            Ok(split) => split,
            Err(err) => {
                warn!("undeliverable request: {err}");
                self.metrics.record_dropped();
                return;
            }
        };
        if header.port == DISCARD_PORT {
            self.metrics.record_dummy();
            return;
        }
        let tx = self.ports.read().get(&header.port).cloned();
        let Some(tx) = tx else {
            warn!("no local socket bound to port {}; dropping request", header.port);
            self.metrics.record_dropped();
            return;
        };
        if tx.send(body.to_vec()).is_err() {
            warn!("local socket on port {} went away; dropping request", header.port);
            self.ports.write().remove(&header.port);
            self.metrics.record_dropped();
            return;
        }
        self.metrics.record_delivered();
    }

    fn deliver_reply(&self, msg: Message) {
        let channel = msg.channel();
        if channel == ChannelId::DISCARD {
            self.metrics.record_dummy();
            return;
        }
        match self.channels.deliver(channel, msg.into_payload()) {
            Ok(()) => self.metrics.record_delivered(),
            Err(err) => {
                warn!("undeliverable reply: {err}");
                self.metrics.record_dropped();
            }
        }
    }
}

impl Outlet for Router {
    fn put_out_request(&self, msg: Message) {
        match self.config.mode.resolve(&msg) {
            Resolution::Forward(next_hop) => self.forward(next_hop, msg),
            Resolution::Deliver => self.deliver_request(msg),
        }
    }

    fn put_out_reply(&self, msg: Message) {
        match self.config.mode.resolve(&msg) {
            Resolution::Forward(next_hop) => self.forward(next_hop, msg),
            Resolution::Deliver => self.deliver_reply(msg),
        }
    }

    fn dummy(&self, direction: Direction) -> Message {
        Message::dummy(direction, &self.config.limits)
    }
}
