//! Dispatch/routing layer.
//!
//! Receives messages released by the output strategy through the
//! [`mixer::Outlet`] seam and decides whether this node is the final hop
//! (deliver to the terminating local socket or owning channel) or an
//! intermediate one (enqueue toward the next hop). The outbound inter-mix
//! queue is bounded and producers block when it is full: back-pressure is
//! the system's only flow control; nothing is ever silently buffered past
//! the timing policy.
//!
//! Delivery to an unknown or closed local destination is logged and the
//! message dropped: retrying at this layer would bypass the batching policy
//! and open a timing side-channel.

mod error;
mod metrics;
mod router;

pub use error::{RoutingError, RoutingResult};
pub use metrics::RouterMetricsSnapshot;
pub use router::{OutboundFrame, Router, RouterConfig, RoutingMode};
