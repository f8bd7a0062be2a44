//! Connection management
//!
//! `Disconnected → Connecting → Connected → Disconnected`, with exactly one
//! session alive at a time. Connecting to a new device always wins: the old
//! session is torn down first, atomically from the caller's perspective,
//! and there is never a window with two "active" endpoints.
//!
//! Transmission is fire-and-forget UDP. A per-call send failure is logged
//! and changes nothing; an error reported asynchronously by the endpoint's
//! own event channel triggers an implicit disconnect.

use crate::error::{ClientError, Result};
use bytes::Bytes;
use glowlink_core::{delta, frame, Rgb};
use glowlink_discovery::Device;
use glowlink_transport::{TransportEvent, TransportReceiver, TransportSender, UdpEndpoint};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// State of one live logical connection
struct Session {
    device: Device,
    sender: Arc<dyn TransportSender>,
    sequence: u16,
    last_sent: Option<[Rgb; 4]>,
    started: Instant,
}

impl Session {
    /// Low 16 bits of the session-monotonic millisecond clock
    fn timestamp(&self) -> u16 {
        self.started.elapsed().as_millis() as u16
    }
}

struct Inner {
    state: RwLock<LinkState>,
    session: Mutex<Option<Session>>,
    /// Handle of the endpoint monitor task for the active session
    monitor: Mutex<Option<JoinHandle<()>>>,
    /// Bumped on every connect/disconnect so stale monitor tasks cannot
    /// tear down a newer session
    epoch: AtomicU64,
}

/// Owns the single active device session
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(LinkState::Disconnected),
                session: Mutex::new(None),
                monitor: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.inner.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// The device holding the active session, flagged connected
    pub fn connected_device(&self) -> Option<Device> {
        self.inner.session.lock().as_ref().map(|s| {
            let mut device = s.device.clone();
            device.connected = true;
            device
        })
    }

    /// Current session sequence counter, for diagnostics
    pub fn sequence(&self) -> Option<u16> {
        self.inner.session.lock().as_ref().map(|s| s.sequence)
    }

    /// Set the `connected` flag across a device list: true only for the
    /// device holding the active session
    pub fn mark_connected(&self, devices: &mut [Device]) {
        let active = self.inner.session.lock().as_ref().map(|s| s.device.addr);
        for device in devices {
            device.connected = active == Some(device.addr);
        }
    }

    /// Connect to a device. Any existing session is torn down first; there
    /// is no "busy" outcome. On success the session starts fresh: sequence
    /// at zero, last-sent baseline unset.
    pub async fn connect(&self, device: Device) -> Result<()> {
        self.teardown();
        *self.inner.state.write() = LinkState::Connecting;

        info!("connecting to {} at {}", device.name, device.socket_addr());

        let endpoint = match UdpEndpoint::bind("0.0.0.0:0").await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                *self.inner.state.write() = LinkState::Disconnected;
                return Err(ClientError::ConnectFailed(e.to_string()));
            }
        };

        let sender = Arc::new(endpoint.sender_to(device.socket_addr()));
        let receiver = endpoint.start_receiver();
        self.install(device, sender, receiver);

        Ok(())
    }

    /// Connect over a caller-supplied transport pair instead of binding a
    /// UDP endpoint. Session semantics are identical to [`Self::connect`];
    /// loopback harnesses use this to drive the endpoint event channel
    /// directly.
    pub fn connect_with_transport(
        &self,
        device: Device,
        sender: Arc<dyn TransportSender>,
        receiver: impl TransportReceiver + 'static,
    ) {
        self.teardown();
        *self.inner.state.write() = LinkState::Connecting;

        info!("connecting to {} at {}", device.name, device.socket_addr());

        self.install(device, sender, receiver);
    }

    /// Install a fresh session and start its endpoint monitor. The session
    /// goes in before the monitor spawns, so an error already queued on the
    /// event channel finds the session in place and tears it down instead
    /// of racing an empty slot.
    fn install(
        &self,
        device: Device,
        sender: Arc<dyn TransportSender>,
        mut receiver: impl TransportReceiver + 'static,
    ) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        *self.inner.session.lock() = Some(Session {
            device,
            sender,
            sequence: 0,
            last_sent: None,
            started: Instant::now(),
        });
        *self.inner.state.write() = LinkState::Connected;

        // Watch the endpoint's event channel; its own error reports force
        // an implicit disconnect. Stale completions after teardown are
        // logged and discarded.
        let inner = self.inner.clone();
        let monitor = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match event {
                    TransportEvent::Error(e) => {
                        if inner.epoch.load(Ordering::SeqCst) == epoch {
                            warn!("endpoint error, disconnecting: {}", e);
                            disconnect_inner(&inner);
                        } else {
                            debug!("stale endpoint error after teardown: {}", e);
                        }
                        break;
                    }
                    TransportEvent::Data(_) => {
                        // Devices do not talk back on the stream socket
                        debug!("ignoring datagram on connection endpoint");
                    }
                }
            }
        });
        *self.inner.monitor.lock() = Some(monitor);
    }

    /// Release the active session. Idempotent: disconnecting while already
    /// disconnected is a no-op, not an error.
    pub fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.teardown();
    }

    fn teardown(&self) {
        disconnect_inner(&self.inner);
    }

    /// Run the delta step against the session's last-sent tuple, commit the
    /// new tuple (before any send, so a failed transmit never rolls the
    /// baseline back), advance the wrapping sequence, and frame the bytes.
    /// `None` when no session is live.
    pub fn encode_next_frame(&self, regions: [Rgb; 4]) -> Option<Bytes> {
        let mut guard = self.inner.session.lock();
        let session = guard.as_mut()?;

        let changed = delta::changed_regions(session.last_sent.as_ref(), &regions);
        session.last_sent = Some(regions);
        session.sequence = session.sequence.wrapping_add(1);

        let payload = delta::payload_for(&changed, &regions);
        Some(frame::encode_update(
            session.sequence,
            session.timestamp(),
            &payload,
        ))
    }

    /// Send one frame, fire-and-forget. Outside `Connected` this is a
    /// logged no-op, not a fault; a transient send error is logged and does
    /// not change connection state.
    pub async fn send_frame(&self, frame: Bytes) {
        let sender = {
            let guard = self.inner.session.lock();
            match guard.as_ref() {
                Some(session) => session.sender.clone(),
                None => {
                    debug!("no active connection, dropping frame");
                    return;
                }
            }
        };

        if let Err(e) = sender.send(frame).await {
            warn!("frame send failed: {}", e);
        }
    }

    /// Send the legacy headerless solid-color command
    pub async fn send_solid(&self, color: Rgb) {
        let packet = Bytes::copy_from_slice(&frame::encode_solid(color));
        self.send_frame(packet).await;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        disconnect_inner(&self.inner);
    }
}

fn disconnect_inner(inner: &Inner) {
    let old = inner.session.lock().take();
    if let Some(session) = old {
        info!("disconnected from {}", session.device.name);
        // The sender drops with the session; the socket closes once the
        // aborted monitor releases its receiver
    }
    let monitor = inner.monitor.lock().take();
    if let Some(monitor) = monitor {
        monitor.abort();
    }
    *inner.state.write() = LinkState::Disconnected;
}
