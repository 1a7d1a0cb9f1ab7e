//! Message model shared by every layer of the mix.
//!
//! This crate exposes the leaf value types the rest of the node is built on:
//! * [`Message`] – immutable unit of transfer: payload, direction, owning
//!   channel, route annotation.
//! * [`Limits`] – per-direction maximum transfer unit; violations are caller
//!   contract errors and panic rather than truncate.
//! * [`Header`] – the final-hop routing header (destination port plus an
//!   optional end-to-end pseudonym) stripped before local delivery.
//! * [`ChannelTable`] – per-connection registry consumed by the routing layer.

mod error;
mod header;
mod message;
mod registry;

pub use error::{MessageError, MessageResult};
pub use header::{Header, DISCARD_PORT};
pub use message::{ChannelId, Direction, Limits, Message, MixRef, Route};
pub use registry::ChannelTable;
