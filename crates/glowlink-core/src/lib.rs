//! Glowlink Core
//!
//! Core types and wire codec for the Glowlink ambient-LED protocol.
//!
//! This crate provides:
//! - Color primitives ([`Rgb`], [`RegionColors`], [`Region`])
//! - Binary color-update framing ([`FrameHeader`], [`UpdatePayload`])
//! - Region delta tracking ([`delta`])
//! - Discovery request/response messages ([`Announcement`])
//!
//! Everything here is pure: no sockets, no clocks, no state. Transport and
//! session management live in `glowlink-transport` and `glowlink-client`.

pub mod announce;
pub mod color;
pub mod delta;
pub mod error;
pub mod frame;

pub use announce::{Announcement, ResolvedAnnouncement};
pub use color::{Region, RegionColors, Rgb};
pub use error::{Error, Result};
pub use frame::{FrameHeader, RegionChange, UpdatePayload};

/// Protocol version carried in every color-update header
pub const PROTOCOL_VERSION: u8 = 1;

/// Magic identifying a Glowlink color-update frame ("GL", big-endian)
pub const MAGIC: u16 = 0x474C;

/// Port a device listens on when its announcement advertises none
pub const DEFAULT_DEVICE_PORT: u16 = 7777;

/// Exact payload a scanner broadcasts to solicit announcements
pub const DISCOVERY_REQUEST: &[u8] = b"ESP_LED_DISCOVERY";

/// `type` discriminator an announcement must carry to be accepted
pub const ANNOUNCE_TYPE: &str = "ESP_LED_DEVICE";
