//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("transport error: {0}")]
    Transport(#[from] glowlink_transport::TransportError),
}
