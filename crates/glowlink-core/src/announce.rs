//! Discovery messages
//!
//! A scanner broadcasts the bare ASCII literal [`crate::DISCOVERY_REQUEST`];
//! devices answer with a small self-describing JSON announcement. All fields
//! but `type` are optional; the fallback chain for missing ones is applied
//! in one place, [`Announcement::resolve`], at decode time.

use crate::{Error, Result, ANNOUNCE_TYPE, DEFAULT_DEVICE_PORT};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Discovery response as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    /// Must equal [`ANNOUNCE_TYPE`] to be accepted
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
}

/// Announcement with every fallback applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnnouncement {
    pub id: String,
    pub name: String,
    pub port: u16,
    pub rssi: Option<i32>,
}

impl Announcement {
    /// Build a well-formed announcement, as a device/responder would send it
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ANNOUNCE_TYPE.to_string(),
            id: Some(id.into()),
            name: Some(name.into()),
            port: None,
            rssi: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Parse a received datagram, rejecting anything whose `type`
    /// discriminator is not ours
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let announcement: Announcement = serde_json::from_slice(bytes)?;
        if announcement.kind != ANNOUNCE_TYPE {
            return Err(Error::AnnouncementType(announcement.kind));
        }
        Ok(announcement)
    }

    pub fn to_json(&self) -> Vec<u8> {
        // Struct of plain scalars, serialization cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Apply the fallback chain against the datagram's sender address:
    /// id defaults to the sender address, name to a label derived from it,
    /// port to the well-known device port
    pub fn resolve(self, sender: SocketAddr) -> ResolvedAnnouncement {
        ResolvedAnnouncement {
            id: self.id.unwrap_or_else(|| sender.ip().to_string()),
            name: self.name.unwrap_or_else(|| format!("LED @ {}", sender.ip())),
            port: self.port.unwrap_or(DEFAULT_DEVICE_PORT),
            rssi: self.rssi,
        }
    }
}
