//! Error types for capability resolution.

use at_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while resolving and running capabilities.
///
/// Providers report failures with this same type, so a provider fault that is
/// not a lookup miss reaches the caller exactly as the provider raised it.
#[derive(Debug, Error)]
pub enum WrapperError {
    /// The provider does not implement the capability (lookup miss).
    #[error("capability not provided: {0}")]
    CapabilityAbsent(String),

    /// The provider implements the capability but not for these arguments.
    #[error("wrong arguments for {name}: {reason}")]
    WrongArguments {
        /// Capability name.
        name: String,
        /// What was wrong.
        reason: String,
    },

    /// A function-style name no provider implements.
    #[error("{0} is not recognized as an API")]
    UnrecognizedCapability(String),

    /// A protocol-style name with no provider and no transport to fall back on.
    #[error("interface is not set for {0}")]
    InterfaceNotSet(String),

    /// Vendor or model identification failed while loading a vendor set.
    #[error("failed to get {0}")]
    VendorIdentification(String),

    /// Protocol-level failure (I/O, patterns, transport).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Any other provider failure.
    #[error("{0}")]
    Failed(String),
}

impl WrapperError {
    /// Whether this error is a lookup miss the resolver may skip over.
    pub fn is_absent(&self) -> bool {
        matches!(self, WrapperError::CapabilityAbsent(_))
    }

    /// Whether this error is an argument mismatch.
    pub fn is_wrong_arguments(&self) -> bool {
        matches!(self, WrapperError::WrongArguments { .. })
    }
}

/// Result type alias for wrapper operations.
pub type WrapperResult<T> = Result<T, WrapperError>;
