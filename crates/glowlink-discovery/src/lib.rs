//! Glowlink Discovery
//!
//! Finds ambient-LED devices on the local network by broadcasting the
//! discovery request and collecting JSON announcements:
//! - [`Scanner`] — the client side: broadcast loop, bounded scan window,
//!   de-duplicated device registry
//! - [`Responder`] — the device side, mainly for loopback tests and demos
//!
//! When no broadcast-capable transport exists the scanner degrades to a
//! fixed, clearly-labeled placeholder device list so the rest of the stack
//! stays exercisable off-network.

pub mod device;
pub mod error;
pub mod responder;
pub mod scanner;

pub use device::{placeholder_devices, Device, DeviceRegistry, RegistryUpdate};
pub use error::{DiscoveryError, Result};
pub use responder::Responder;
pub use scanner::{ScanConfig, ScanEvent, ScanState, Scanner};
