//! Core message value types.

use smallvec::SmallVec;
use std::time::Duration;

/// Transfer direction of a message within the mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client-to-destination traffic, moving forward through the route.
    Request,
    /// Destination-to-client traffic, moving backward through the route.
    Reply,
}

impl Direction {
    /// Human-readable label used in logs and panic messages.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Reply => "reply",
        }
    }
}

/// Opaque identity of the local connection a message belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Sentinel identity that owns dummy replies; deliveries to it are
    /// consumed silently.
    pub const DISCARD: ChannelId = ChannelId(0);
}

/// Index of a mix in the node's directory (cascade position or free-route
/// peer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MixRef(pub u16);

/// Route annotation carried by a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Follow the node's configured default route.
    Default,
    /// Explicit hop list; an empty list means "no further hop, deliver
    /// locally".
    Hops(SmallVec<[MixRef; 4]>),
}

impl Route {
    /// Builds an explicit hop list.
    pub fn hops(hops: impl IntoIterator<Item = MixRef>) -> Self {
        Route::Hops(hops.into_iter().collect())
    }
}

/// Per-direction maximum transfer unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum request payload size in bytes.
    pub request_size: usize,
    /// Maximum reply payload size in bytes.
    pub reply_size: usize,
}

impl Limits {
    /// Maximum permissible size of the next outgoing unit in `direction`.
    pub fn max_size(&self, direction: Direction) -> usize {
        match direction {
            Direction::Request => self.request_size,
            Direction::Reply => self.reply_size,
        }
    }
}

/// Immutable unit of transfer.
///
/// A message is created by the recoding/application layer, organized (but
/// never mutated) by the output strategy, and destroyed once the routing
/// layer forwards it. The creation stamp feeds statistics and ordering only,
/// never correctness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    payload: Vec<u8>,
    direction: Direction,
    channel: ChannelId,
    route: Route,
    created_at: Option<Duration>,
}

impl Message {
    /// Builds a request owned by `channel`.
    ///
    /// # Panics
    ///
    /// Panics when the payload exceeds the request transfer unit; truncating
    /// would corrupt an anonymized payload, so the violation is loud.
    pub fn request(channel: ChannelId, payload: Vec<u8>, limits: &Limits) -> Self {
        Self::build(Direction::Request, channel, payload, limits)
    }

    /// Builds a reply owned by `channel`.
    ///
    /// # Panics
    ///
    /// Panics when the payload exceeds the reply transfer unit.
    pub fn reply(channel: ChannelId, payload: Vec<u8>, limits: &Limits) -> Self {
        Self::build(Direction::Reply, channel, payload, limits)
    }

    fn build(direction: Direction, channel: ChannelId, payload: Vec<u8>, limits: &Limits) -> Self {
        assert!(
            payload.len() <= limits.max_size(direction),
            "{} payload of {} bytes exceeds the {}-byte transfer unit",
            direction.label(),
            payload.len(),
            limits.max_size(direction)
        );
        Self {
            payload,
            direction,
            channel,
            route: Route::Default,
            created_at: None,
        }
    }

    /// Synthetic zero-content filler of exactly the direction's maximum size.
    ///
    /// A request dummy's leading zero bytes double as the discard port, and a
    /// reply dummy belongs to [`ChannelId::DISCARD`], so dummies vanish at
    /// their final hop without a dedicated flag that an observer could see.
    pub fn dummy(direction: Direction, limits: &Limits) -> Self {
        Self {
            payload: vec![0u8; limits.max_size(direction)],
            direction,
            channel: ChannelId::DISCARD,
            route: Route::Default,
            created_at: None,
        }
    }

    /// Replaces the route annotation.
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    /// Attaches a creation stamp (statistics/ordering only).
    pub fn with_created_at(mut self, at: Duration) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the message, yielding its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Transfer direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Owning connection identity.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Route annotation.
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Creation stamp, when the producer attached one.
    pub fn created_at(&self) -> Option<Duration> {
        self.created_at
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
