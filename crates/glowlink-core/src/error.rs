//! Error types for Glowlink

use thiserror::Error;

/// Result type alias for Glowlink codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Glowlink codec error types
#[derive(Error, Debug)]
pub enum Error {
    /// First two header bytes are not the protocol magic
    #[error("invalid magic: expected 0x474c, got 0x{0:04x}")]
    InvalidMagic(u16),

    /// Header carries a protocol version we do not speak
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Buffer ends before the frame does
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Payload command byte is not one we know
    #[error("unknown command byte: 0x{0:02x}")]
    UnknownCommand(u8),

    /// Delta payload declares a different entry count than it carries
    #[error("delta count mismatch: declared {declared}, buffer holds {actual}")]
    DeltaCountMismatch { declared: usize, actual: usize },

    /// Region index outside 0..=3
    #[error("invalid region index: {0}")]
    InvalidRegion(u8),

    /// Hex color string that does not parse as #rrggbb
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// Announcement whose `type` field is not the expected discriminator
    #[error("unexpected announcement type: {0:?}")]
    AnnouncementType(String),

    /// Announcement that is not well-formed JSON
    #[error("decode error: {0}")]
    DecodeError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DecodeError(e.to_string())
    }
}
