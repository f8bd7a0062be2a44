//! Glowlink Transport Layer
//!
//! Async UDP endpoints for the Glowlink protocol. Two independent kinds of
//! endpoint exist at runtime: a broadcast-capable one owned by discovery and
//! a unicast one owned by the active connection. They never share a socket;
//! closing one cannot affect the other.
//!
//! Sends are fire-and-forget. Receive and socket errors are delivered as
//! [`TransportEvent`]s over a channel back to the owning task, never thrown
//! across it.

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{TransportEvent, TransportReceiver, TransportSender};
pub use udp::{broadcast_addr, UdpConfig, UdpEndpoint, UdpReceiver, UdpSender};
