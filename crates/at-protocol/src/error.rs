//! Error types for the AT protocol layer.

use thiserror::Error;

/// Errors that can occur while talking to a device over the AT protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read-loop or framing pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The value handed to a classifier is not a textual response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The transport reported a failure of its own.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport has no open connection.
    #[error("transport is not connected")]
    NotConnected,
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
