//! Connection manager integration tests against a fake device on loopback

use async_trait::async_trait;
use bytes::Bytes;
use glowlink_client::{ConnectionManager, LinkState};
use glowlink_core::frame::{decode_update, UpdatePayload};
use glowlink_core::{Region, Rgb};
use glowlink_discovery::Device;
use glowlink_transport::{TransportEvent, TransportReceiver, TransportSender, UdpEndpoint};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Bind a loopback "device" that forwards every received datagram
async fn fake_device(name: &str) -> (Device, mpsc::Receiver<Bytes>) {
    let endpoint = UdpEndpoint::bind("127.0.0.1:0").await.unwrap();
    let port = endpoint.local_addr().unwrap().port();

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(async move {
        let mut receiver = endpoint.start_receiver();
        while let Some((event, _)) = receiver.recv_from().await {
            if let TransportEvent::Data(data) = event {
                if tx.send(data).await.is_err() {
                    break;
                }
            }
        }
    });

    let device = Device {
        id: name.to_string(),
        name: name.to_string(),
        addr: "127.0.0.1".parse::<IpAddr>().unwrap(),
        port,
        rssi: None,
        connected: false,
    };
    (device, rx)
}

async fn next_frame(rx: &mut mpsc::Receiver<Bytes>) -> Bytes {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("device channel closed")
}

fn uniform(hex: &str) -> [Rgb; 4] {
    [Rgb::from_hex(hex).unwrap(); 4]
}

/// Sender half of a channel-backed transport; frames land in a channel
/// instead of a socket
struct ChannelSender {
    tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl TransportSender for ChannelSender {
    async fn send(&self, data: Bytes) -> glowlink_transport::Result<()> {
        let _ = self.tx.send(data).await;
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    async fn close(&self) -> glowlink_transport::Result<()> {
        Ok(())
    }
}

/// Receiver half; the test drives the event channel by hand
struct ChannelReceiver {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for ChannelReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

/// A transport pair standing in for a UDP endpoint: outgoing frames and
/// incoming endpoint events are both plain channels
fn channel_transport() -> (
    Arc<ChannelSender>,
    ChannelReceiver,
    mpsc::Receiver<Bytes>,
    mpsc::UnboundedSender<TransportEvent>,
) {
    let (frame_tx, frame_rx) = mpsc::channel(256);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        Arc::new(ChannelSender { tx: frame_tx }),
        ChannelReceiver { rx: event_rx },
        frame_rx,
        event_tx,
    )
}

fn device_stub(name: &str) -> Device {
    Device {
        id: name.to_string(),
        name: name.to_string(),
        addr: "127.0.0.1".parse::<IpAddr>().unwrap(),
        port: 7777,
        rssi: None,
        connected: false,
    }
}

async fn wait_for_disconnect(manager: &ConnectionManager) {
    timeout(Duration::from_secs(2), async {
        while manager.state() != LinkState::Disconnected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("endpoint error never disconnected");
}

#[tokio::test]
async fn test_full_then_delta_on_the_wire() {
    let (device, mut rx) = fake_device("strip").await;
    let manager = ConnectionManager::new();
    manager.connect(device).await.unwrap();

    // First sample against the unset baseline: full frame
    let first = uniform("#102030");
    let frame = manager.encode_next_frame(first).unwrap();
    manager.send_frame(frame).await;

    let (header, payload) = decode_update(&next_frame(&mut rx).await).unwrap();
    assert!(!header.delta);
    assert_eq!(header.sequence, 1);
    assert_eq!(payload, UpdatePayload::Full(first));

    // Only `right` changes: delta with one entry
    let mut second = first;
    second[Region::Right.index() as usize] = Rgb::from_hex("#ffffff").unwrap();
    let frame = manager.encode_next_frame(second).unwrap();
    manager.send_frame(frame).await;

    let (header, payload) = decode_update(&next_frame(&mut rx).await).unwrap();
    assert!(header.delta);
    assert_eq!(header.sequence, 2);
    match payload {
        UpdatePayload::Delta(changes) => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].region, Region::Right);
            assert_eq!(changes[0].color, Rgb::new(255, 255, 255));
        }
        other => panic!("expected delta, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sequence_wraps_without_skipping() {
    let (device, _rx) = fake_device("strip").await;
    let manager = ConnectionManager::new();
    manager.connect(device).await.unwrap();

    let sample = uniform("#808080");
    for i in 0u32..65536 {
        let frame = manager.encode_next_frame(sample).unwrap();
        let (header, _) = decode_update(&frame).unwrap();
        assert_eq!(header.sequence, ((i + 1) & 0xFFFF) as u16);
    }
    // 65536 frames later the counter is back at zero
    assert_eq!(manager.sequence(), Some(0));
}

#[tokio::test]
async fn test_session_singleton_across_reconnect() {
    let (device_a, mut rx_a) = fake_device("a").await;
    let (device_b, mut rx_b) = fake_device("b").await;
    let manager = ConnectionManager::new();

    manager.connect(device_a.clone()).await.unwrap();
    let frame = manager.encode_next_frame(uniform("#111111")).unwrap();
    manager.send_frame(frame).await;
    next_frame(&mut rx_a).await;

    // Connecting to B tears A down; no "busy" outcome exists
    manager.connect(device_b.clone()).await.unwrap();
    assert_eq!(manager.state(), LinkState::Connected);
    assert_eq!(manager.connected_device().unwrap().id, "b");

    let mut devices = vec![device_a, device_b];
    manager.mark_connected(&mut devices);
    assert!(!devices[0].connected);
    assert!(devices[1].connected);

    // Fresh session: sequence restarts and the baseline is unset again,
    // so the first frame to B is full with sequence 1
    let frame = manager.encode_next_frame(uniform("#111111")).unwrap();
    manager.send_frame(frame).await;

    let (header, payload) = decode_update(&next_frame(&mut rx_b).await).unwrap();
    assert!(!header.delta);
    assert_eq!(header.sequence, 1);
    assert_eq!(payload, UpdatePayload::Full(uniform("#111111")));

    // Nothing further reaches A
    assert!(timeout(Duration::from_millis(200), rx_a.recv()).await.is_err());
}

#[tokio::test]
async fn test_misuse_is_a_noop_not_an_error() {
    let manager = ConnectionManager::new();
    assert_eq!(manager.state(), LinkState::Disconnected);

    // Send while disconnected: dropped, not a fault
    manager.send_frame(Bytes::from_static(&[0u8; 8])).await;
    assert!(manager.encode_next_frame(uniform("#000000")).is_none());

    // Disconnect while disconnected: idempotent
    manager.disconnect();
    manager.disconnect();
    assert_eq!(manager.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_clears_session() {
    let (device, _rx) = fake_device("strip").await;
    let manager = ConnectionManager::new();
    manager.connect(device).await.unwrap();
    assert!(manager.connected_device().is_some());

    manager.disconnect();
    assert_eq!(manager.state(), LinkState::Disconnected);
    assert!(manager.connected_device().is_none());
    assert_eq!(manager.sequence(), None);
}

#[tokio::test]
async fn test_endpoint_error_forces_implicit_disconnect() {
    let (sender, receiver, mut frames, events) = channel_transport();
    let manager = ConnectionManager::new();
    manager.connect_with_transport(device_stub("strip"), sender, receiver);
    assert_eq!(manager.state(), LinkState::Connected);

    // Frames flow through the injected sender like any other session
    let frame = manager.encode_next_frame(uniform("#102030")).unwrap();
    manager.send_frame(frame).await;
    let (header, _) = decode_update(&next_frame(&mut frames).await).unwrap();
    assert_eq!(header.sequence, 1);

    events
        .send(TransportEvent::Error("port unreachable".to_string()))
        .unwrap();

    wait_for_disconnect(&manager).await;
    assert!(manager.connected_device().is_none());
    assert_eq!(manager.sequence(), None);
    assert!(manager.encode_next_frame(uniform("#102030")).is_none());
}

#[tokio::test]
async fn test_stale_endpoint_error_cannot_kill_new_session() {
    let (sender_a, receiver_a, _frames_a, events_a) = channel_transport();
    let (sender_b, receiver_b, _frames_b, _events_b) = channel_transport();
    let manager = ConnectionManager::new();

    manager.connect_with_transport(device_stub("a"), sender_a, receiver_a);
    manager.connect_with_transport(device_stub("b"), sender_b, receiver_b);
    assert_eq!(manager.connected_device().unwrap().id, "b");

    // A's endpoint reports an error after its session was superseded
    let _ = events_a.send(TransportEvent::Error("late".to_string()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(manager.state(), LinkState::Connected);
    assert_eq!(manager.connected_device().unwrap().id, "b");
}

#[tokio::test]
async fn test_error_queued_at_connect_time_still_tears_down() {
    let (sender, receiver, _frames, events) = channel_transport();
    // The error is already waiting on the event channel before connect runs
    events
        .send(TransportEvent::Error("dead on arrival".to_string()))
        .unwrap();

    let manager = ConnectionManager::new();
    manager.connect_with_transport(device_stub("strip"), sender, receiver);

    wait_for_disconnect(&manager).await;
    assert!(manager.connected_device().is_none());
}

#[tokio::test]
async fn test_legacy_solid_color_packet() {
    let (device, mut rx) = fake_device("strip").await;
    let manager = ConnectionManager::new();
    manager.connect(device).await.unwrap();

    manager.send_solid(Rgb::from_hex("#a0b0c0").unwrap()).await;

    let packet = next_frame(&mut rx).await;
    assert_eq!(packet.as_ref(), &[0x00, 0xA0, 0xB0, 0xC0]);
    // Headerless: no sequence advanced
    assert_eq!(manager.sequence(), Some(0));
}
