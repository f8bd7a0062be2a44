//! Broadcast scan state machine
//!
//! `Idle → Scanning → Idle`. A single spawned task owns the broadcast
//! interval, the receive loop, and the hard scan deadline, so stopping the
//! scan (or hitting the deadline) cancels all three at once — no broadcast
//! keeps firing after the scanner reports idle.

use crate::device::{placeholder_devices, Device, DeviceRegistry, RegistryUpdate};
use crate::error::{DiscoveryError, Result};
use glowlink_core::{Announcement, DEFAULT_DEVICE_PORT, DISCOVERY_REQUEST};
use glowlink_transport::{broadcast_addr, TransportEvent, UdpEndpoint};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Scan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Events emitted while a scan runs
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// New device appended to the registry
    Found(Device),
    /// Known device re-announced itself; rssi refreshed
    Updated(Device),
    /// Scan window elapsed (or the placeholder path completed)
    Finished,
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Port the discovery request is broadcast to
    pub port: u16,
    /// Send the request somewhere other than the limited-broadcast address.
    /// Used by loopback tests; `None` means 255.255.255.255.
    pub target: Option<SocketAddr>,
    /// How often the request is re-broadcast while scanning
    pub broadcast_interval: Duration,
    /// Hard limit on the scan window
    pub scan_window: Duration,
    /// Platform capability gate: may we scan the network at all?
    pub permitted: bool,
    /// Whether a broadcast-capable transport exists in this environment
    pub network_available: bool,
    /// Delay before the placeholder list appears on the no-network path
    pub simulated_delay: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_DEVICE_PORT,
            target: None,
            broadcast_interval: Duration::from_secs(3),
            scan_window: Duration::from_secs(30),
            permitted: true,
            network_available: true,
            simulated_delay: Duration::from_millis(1500),
        }
    }
}

/// Discover Glowlink devices via UDP broadcast
pub struct Scanner {
    config: ScanConfig,
    state: Arc<RwLock<ScanState>>,
    registry: Arc<Mutex<DeviceRegistry>>,
    /// Bumped on every start/stop so a scan task that slipped past its
    /// abort cannot flip a newer scan back to idle
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ScanState::Idle)),
            registry: Arc::new(Mutex::new(DeviceRegistry::new())),
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn state(&self) -> ScanState {
        *self.state.read()
    }

    /// Devices observed so far in the current (or last) scan, in
    /// first-seen order
    pub fn devices(&self) -> Vec<Device> {
        self.registry.lock().snapshot()
    }

    /// Start a scan. Clears the registry, then either runs the broadcast
    /// loop for the configured window or, without a broadcast transport,
    /// produces the placeholder list after a simulated delay.
    ///
    /// Refused up front with [`DiscoveryError::PermissionDenied`] when the
    /// capability gate is closed. Starting while already scanning restarts.
    pub async fn start_scan(&mut self) -> Result<mpsc::Receiver<ScanEvent>> {
        if !self.config.permitted {
            return Err(DiscoveryError::PermissionDenied);
        }

        self.stop_scan();
        self.registry.lock().clear();
        let scan_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write() = ScanState::Scanning;

        let (tx, rx) = mpsc::channel(32);

        let endpoint = if self.config.network_available {
            match UdpEndpoint::bind_broadcast().await {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    warn!("no broadcast transport available: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let config = self.config.clone();
        let state = self.state.clone();
        let registry = self.registry.clone();
        let generation = self.generation.clone();

        self.task = Some(match endpoint {
            Some(endpoint) => tokio::spawn(async move {
                run_scan(endpoint, config, registry, tx).await;
                finish_scan(&state, &generation, scan_gen);
            }),
            None => tokio::spawn(async move {
                run_placeholder(config, registry, tx).await;
                finish_scan(&state, &generation, scan_gen);
            }),
        });

        Ok(rx)
    }

    /// Cancel the running scan. The scan task owns the broadcast interval
    /// and the deadline, so aborting it stops both together. No-op when
    /// already idle.
    pub fn stop_scan(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        *self.state.write() = ScanState::Idle;
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Only the scan that set `Scanning` may set it back to `Idle`. A task
/// finishing naturally just as a restart supersedes it sees a newer
/// generation and leaves the state alone.
fn finish_scan(state: &RwLock<ScanState>, generation: &AtomicU64, scan_gen: u64) {
    if generation.load(Ordering::SeqCst) == scan_gen {
        *state.write() = ScanState::Idle;
    }
}

async fn run_scan(
    endpoint: UdpEndpoint,
    config: ScanConfig,
    registry: Arc<Mutex<DeviceRegistry>>,
    tx: mpsc::Sender<ScanEvent>,
) {
    let target = config.target.unwrap_or_else(|| broadcast_addr(config.port));
    let mut receiver = endpoint.start_receiver();

    let mut ticker = tokio::time::interval(config.broadcast_interval);
    let deadline = tokio::time::sleep(config.scan_window);
    tokio::pin!(deadline);

    info!("scanning for devices via {}", target);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                debug!("scan window elapsed");
                break;
            }
            _ = ticker.tick() => {
                // A failed broadcast does not abort the scan
                if let Err(e) = endpoint.send_to(DISCOVERY_REQUEST, target).await {
                    warn!("discovery broadcast failed: {}", e);
                }
            }
            received = receiver.recv_from() => {
                match received {
                    Some((TransportEvent::Data(data), from)) => {
                        handle_datagram(&data, from, &registry, &tx).await;
                    }
                    Some((TransportEvent::Error(e), _)) => {
                        // Scan continues until its own timeout or stop
                        warn!("discovery socket error: {}", e);
                    }
                    None => break,
                }
            }
        }
    }

    let _ = tx.send(ScanEvent::Finished).await;
}

async fn handle_datagram(
    data: &[u8],
    from: SocketAddr,
    registry: &Arc<Mutex<DeviceRegistry>>,
    tx: &mpsc::Sender<ScanEvent>,
) {
    // Malformed or foreign datagrams are dropped silently
    let announcement = match Announcement::from_json(data) {
        Ok(announcement) => announcement,
        Err(e) => {
            debug!("ignoring datagram from {}: {}", from, e);
            return;
        }
    };

    let update = registry
        .lock()
        .observe(announcement.resolve(from), from.ip());

    let event = match update {
        RegistryUpdate::New(device) => {
            info!("discovered {} at {}", device.name, device.socket_addr());
            ScanEvent::Found(device)
        }
        RegistryUpdate::Refreshed(device) => ScanEvent::Updated(device),
    };

    let _ = tx.send(event).await;
}

async fn run_placeholder(
    config: ScanConfig,
    registry: Arc<Mutex<DeviceRegistry>>,
    tx: mpsc::Sender<ScanEvent>,
) {
    info!("no broadcast transport, producing simulated device list");
    tokio::time::sleep(config.simulated_delay).await;

    let devices = placeholder_devices();
    registry.lock().replace(devices.clone());

    for device in devices {
        let _ = tx.send(ScanEvent::Found(device)).await;
    }
    let _ = tx.send(ScanEvent::Finished).await;
}
