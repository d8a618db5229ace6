//! Error types for the runner.

use at_protocol::ProtocolError;
use at_wrapper::WrapperError;
use thiserror::Error;

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// I/O error reading configuration or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// Session-level failure.
    #[error(transparent)]
    Wrapper(#[from] WrapperError),

    /// Protocol-level failure while connecting.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The device did not answer the probe.
    #[error("device did not answer after {0} probe rounds")]
    NoResponse(u32),

    /// A setting or argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
