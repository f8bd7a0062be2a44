//! Discovery error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Network scanning is not permitted by the platform capability gate.
    /// Distinct from an empty scan result.
    #[error("network scanning not permitted")]
    PermissionDenied,

    #[error("network error: {0}")]
    Network(String),
}

impl From<glowlink_transport::TransportError> for DiscoveryError {
    fn from(e: glowlink_transport::TransportError) -> Self {
        DiscoveryError::Network(e.to_string())
    }
}
