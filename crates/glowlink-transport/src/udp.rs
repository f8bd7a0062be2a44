//! UDP endpoint implementation

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::traits::{TransportEvent, TransportReceiver, TransportSender};

/// The limited-broadcast address on a given port
pub fn broadcast_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([255, 255, 255, 255], port))
}

/// UDP endpoint configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Maximum datagram size we will receive
    pub max_datagram_size: usize,
    /// Depth of the event channel between socket and owner
    pub event_queue_depth: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: 2048,
            event_queue_depth: 64,
        }
    }
}

/// A bound UDP socket, usable for unicast send and async receive
pub struct UdpEndpoint {
    socket: Arc<UdpSocket>,
    config: UdpConfig,
}

impl UdpEndpoint {
    /// Bind to a local address
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        if let Ok(local) = socket.local_addr() {
            debug!("udp endpoint bound to {}", local);
        }

        Ok(Self {
            socket: Arc::new(socket),
            config: UdpConfig::default(),
        })
    }

    /// Bind an ephemeral endpoint with broadcast enabled, as discovery
    /// needs. Failure here is the "no broadcast-capable transport" signal,
    /// not a fatal condition.
    pub async fn bind_broadcast() -> Result<Self> {
        let endpoint = Self::bind("0.0.0.0:0").await?;
        endpoint
            .socket
            .set_broadcast(true)
            .map_err(|e| TransportError::BroadcastUnavailable(e.to_string()))?;
        info!("broadcast endpoint ready on {:?}", endpoint.socket.local_addr().ok());
        Ok(endpoint)
    }

    pub fn with_config(mut self, config: UdpConfig) -> Self {
        self.config = config;
        self
    }

    /// Local address of the bound socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Send one datagram to a specific address
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, target)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    /// A sender pinned to one remote address
    pub fn sender_to(&self, remote: SocketAddr) -> UdpSender {
        UdpSender {
            socket: self.socket.clone(),
            remote,
            open: Arc::new(Mutex::new(true)),
        }
    }

    /// Start the receive loop. Datagrams and socket errors arrive as
    /// [`TransportEvent`]s; the loop ends when the receiver is dropped.
    pub fn start_receiver(&self) -> UdpReceiver {
        let (tx, rx) = mpsc::channel(self.config.event_queue_depth);
        let socket = self.socket.clone();
        let max_size = self.config.max_datagram_size;

        tokio::spawn(async move {
            let mut buf = vec![0u8; max_size];

            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        if tx.send((TransportEvent::Data(data), from)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("udp receive error: {}", e);
                        let event = TransportEvent::Error(e.to_string());
                        let from = SocketAddr::from(([0, 0, 0, 0], 0));
                        if tx.send((event, from)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        UdpReceiver { rx }
    }
}

/// Sender half pinned to a single remote. Clones share the socket and the
/// open flag, so closing any clone closes them all.
#[derive(Clone)]
pub struct UdpSender {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    open: Arc<Mutex<bool>>,
}

impl UdpSender {
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }
}

#[async_trait]
impl TransportSender for UdpSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !*self.open.lock() {
            return Err(TransportError::Closed);
        }
        self.socket
            .send_to(&data, self.remote)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        *self.open.lock()
    }

    async fn close(&self) -> Result<()> {
        *self.open.lock() = false;
        Ok(())
    }
}

/// Receiver half of an endpoint
pub struct UdpReceiver {
    rx: mpsc::Receiver<(TransportEvent, SocketAddr)>,
}

impl UdpReceiver {
    /// Next event along with the datagram's source address
    pub async fn recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)> {
        self.rx.recv().await
    }
}

#[async_trait]
impl TransportReceiver for UdpReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await.map(|(event, _)| event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let endpoint = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();
        assert!(endpoint.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn test_send_recv_roundtrip() {
        let receiver_ep = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();
        let sender_ep = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();

        let target = receiver_ep.local_addr().unwrap();
        let mut receiver = receiver_ep.start_receiver();

        sender_ep.send_to(b"glow", target).await.unwrap();

        let (event, from) = receiver.recv_from().await.unwrap();
        match event {
            TransportEvent::Data(data) => assert_eq!(data.as_ref(), b"glow"),
            other => panic!("expected data, got {other:?}"),
        }
        assert_eq!(from.port(), sender_ep.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn test_closed_sender_refuses() {
        let a = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();
        let b = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();

        let sender = a.sender_to(b.local_addr().unwrap());
        assert!(sender.is_open());
        sender.close().await.unwrap();
        assert!(!sender.is_open());

        let err = sender.send(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn test_broadcast_addr() {
        assert_eq!(broadcast_addr(7777).to_string(), "255.255.255.255:7777");
    }
}
