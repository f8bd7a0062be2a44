//! Glowlink Client
//!
//! The stateful half of the protocol engine:
//! - [`ConnectionManager`] — at most one live session to one device;
//!   connect/disconnect, sequence tracking, frame transmission
//! - [`ColorStreamer`] — the periodic capture → delta → encode → send loop
//!
//! # Example
//!
//! ```ignore
//! use glowlink_client::{ConnectionManager, ColorStreamer, StreamConfig};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(ConnectionManager::new());
//! manager.connect(device).await?;
//!
//! let streamer = ColorStreamer::new(manager.clone(), capture_source);
//! streamer.start(StreamConfig::default());
//! ```

pub mod connection;
pub mod error;
pub mod streamer;

pub use connection::{ConnectionManager, LinkState};
pub use error::{ClientError, Result};
pub use streamer::{CaptureSource, ColorStreamer, CropRect, StreamConfig};
