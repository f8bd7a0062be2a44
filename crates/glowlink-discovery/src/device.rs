//! Device representation and scan registry

use glowlink_core::{ResolvedAnnouncement, DEFAULT_DEVICE_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// A discovered ambient-LED device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Identifier the device announced, or its address when it announced none
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Network address, the de-duplication key during a scan
    pub addr: IpAddr,
    /// Port the device receives color updates on
    pub port: u16,
    /// Signal strength from the latest announcement, if reported
    pub rssi: Option<i32>,
    /// Whether this device holds the active connection
    pub connected: bool,
}

impl Device {
    pub fn from_announcement(resolved: ResolvedAnnouncement, sender: IpAddr) -> Self {
        Self {
            id: resolved.id,
            name: resolved.name,
            addr: sender,
            port: resolved.port,
            rssi: resolved.rssi,
            connected: false,
        }
    }

    /// Address to stream color updates to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// Fixed device set used when no broadcast transport exists. Names make the
/// simulation obvious in any device list.
pub fn placeholder_devices() -> Vec<Device> {
    [
        ("sim-1", "Simulated LED (Living Room)", [10, 0, 0, 101]),
        ("sim-2", "Simulated LED (Desk)", [10, 0, 0, 102]),
        ("sim-3", "Simulated LED (TV Backlight)", [10, 0, 0, 103]),
    ]
    .into_iter()
    .map(|(id, name, octets)| Device {
        id: id.to_string(),
        name: name.to_string(),
        addr: IpAddr::V4(Ipv4Addr::from(octets)),
        port: DEFAULT_DEVICE_PORT,
        rssi: None,
        connected: false,
    })
    .collect()
}

/// What a registry observation did
#[derive(Debug, Clone)]
pub enum RegistryUpdate {
    /// First announcement from this address
    New(Device),
    /// Repeat announcement; only signal strength was refreshed
    Refreshed(Device),
}

/// Scan-scoped device list, de-duplicated by sender address and kept in
/// first-seen order
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one announcement. A known sender address only refreshes rssi;
    /// a new one appends, preserving discovery order.
    pub fn observe(&mut self, resolved: ResolvedAnnouncement, sender: IpAddr) -> RegistryUpdate {
        if let Some(existing) = self.devices.iter_mut().find(|d| d.addr == sender) {
            existing.rssi = resolved.rssi;
            return RegistryUpdate::Refreshed(existing.clone());
        }

        let device = Device::from_announcement(resolved, sender);
        self.devices.push(device.clone());
        RegistryUpdate::New(device)
    }

    /// Replace the whole list (placeholder path)
    pub fn replace(&mut self, devices: Vec<Device>) {
        self.devices = devices;
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn snapshot(&self) -> Vec<Device> {
        self.devices.clone()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(id: &str, rssi: Option<i32>) -> ResolvedAnnouncement {
        ResolvedAnnouncement {
            id: id.to_string(),
            name: format!("dev {id}"),
            port: DEFAULT_DEVICE_PORT,
            rssi,
        }
    }

    #[test]
    fn test_same_address_refreshes_rssi_only() {
        let mut registry = DeviceRegistry::new();
        let addr: IpAddr = "192.168.1.5".parse().unwrap();

        let first = registry.observe(resolved("a", Some(-40)), addr);
        assert!(matches!(first, RegistryUpdate::New(_)));

        // Same address again, different id and rssi
        let second = registry.observe(resolved("b", Some(-70)), addr);
        match second {
            RegistryUpdate::Refreshed(device) => {
                assert_eq!(device.id, "a"); // identity key is the address
                assert_eq!(device.rssi, Some(-70));
            }
            other => panic!("expected refresh, got {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_addresses_preserve_order() {
        let mut registry = DeviceRegistry::new();
        for n in 1..=3u8 {
            let addr: IpAddr = format!("192.168.1.{n}").parse().unwrap();
            registry.observe(resolved(&format!("dev{n}"), None), addr);
        }

        let ids: Vec<_> = registry.snapshot().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["dev1", "dev2", "dev3"]);
    }

    #[test]
    fn test_placeholders_are_labeled() {
        let devices = placeholder_devices();
        assert!(!devices.is_empty());
        for device in devices {
            assert!(device.name.contains("Simulated"));
        }
    }
}
