//! Transport trait definitions
//!
//! The connection manager and discovery service only see these seams, so
//! tests can stand in loopback endpoints for real network hardware.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Events delivered from a transport endpoint to its owning task
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Datagram received
    Data(Bytes),
    /// Socket-level error observed asynchronously
    Error(String),
}

/// Trait for sending datagrams toward one remote
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Send one datagram, fire-and-forget
    async fn send(&self, data: Bytes) -> Result<()>;

    /// False once the sender has been closed
    fn is_open(&self) -> bool;

    /// Close the sender; later sends report [`crate::TransportError::Closed`]
    async fn close(&self) -> Result<()>;
}

/// Trait for receiving transport events
#[async_trait]
pub trait TransportReceiver: Send {
    /// Next event, or `None` once the endpoint is gone
    async fn recv(&mut self) -> Option<TransportEvent>;
}
