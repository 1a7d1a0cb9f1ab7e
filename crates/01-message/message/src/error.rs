use thiserror::Error;

use crate::message::ChannelId;

/// Result alias for message-layer operations.
pub type MessageResult<T> = Result<T, MessageError>;

/// Errors surfaced by the message layer.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Payload too short to carry the final-hop routing header.
    #[error("routing header truncated: payload holds {len} bytes, header needs {need}")]
    HeaderTruncated {
        /// Bytes actually present in the payload.
        len: usize,
        /// Bytes the configured header occupies.
        need: usize,
    },

    /// Delivery target does not exist in the channel registry.
    #[error("unknown channel {0:?}")]
    UnknownChannel(ChannelId),

    /// Delivery target exists but its receiver has gone away.
    #[error("channel {0:?} is closed")]
    ChannelClosed(ChannelId),
}
