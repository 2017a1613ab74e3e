//! Error types for the delegated channel.

use thiserror::Error;

/// Errors that can occur talking to the external decryptor.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The other end of the channel is gone.
    #[error("channel closed")]
    Closed,

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// A message could not be encoded or decoded.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    /// The request was dropped before a response arrived.
    #[error("no response for '{0}'")]
    Abandoned(String),
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
