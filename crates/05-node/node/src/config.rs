//! Node configuration surface.
//!
//! Loading and parsing belong to an outer layer; the types here only derive
//! serde so that layer has something to deserialize into. Validation is this
//! crate's job and happens fail-fast in [`MixNode::new`](crate::MixNode::new).

use message::Limits;
use mixer::StrategyConfig;
use serde::{Deserialize, Serialize};

/// Cascade placement of this node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadePosition {
    /// This node's index in the cascade, starting at 0.
    pub position: usize,
    /// Total number of mixes in the cascade.
    pub length: usize,
}

/// Full configuration of a mix node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Output strategy and its named parameters.
    pub strategy: StrategyConfig,
    /// Cascade placement; `None` selects free routing.
    pub cascade: Option<CascadePosition>,
    /// Maximum request payload size in bytes.
    pub request_size: usize,
    /// Maximum reply payload size in bytes.
    pub reply_size: usize,
    /// Whether final-hop request headers carry the end-to-end pseudonym.
    pub with_pseudonym: bool,
    /// Capacity of the outbound inter-mix queue.
    pub queue_capacity: usize,
    /// Capacity of each local port's and channel's delivery queue.
    pub delivery_capacity: usize,
    /// Fixed randomness seed for simulation runs; `None` draws OS entropy.
    pub seed: Option<u64>,
}

impl NodeConfig {
    /// The per-direction transfer units as the message layer sees them.
    pub fn limits(&self) -> Limits {
        Limits {
            request_size: self.request_size,
            reply_size: self.reply_size,
        }
    }
}
