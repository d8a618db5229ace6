//! Values produced by capabilities.

use std::time::Duration;

use at_protocol::{FieldValue, ParserChain, ProtocolError, ProtocolResult, RawResponse, Response};

/// Options passed along with every capability call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Suppress logging of the exchange.
    pub quiet: bool,
    /// Override the registry's read timeout for protocol executions.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Options with logging suppressed.
    pub fn quiet() -> Self {
        CallOptions {
            quiet: true,
            ..CallOptions::default()
        }
    }

    /// Options with a specific read timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        CallOptions {
            timeout: Some(timeout),
            ..CallOptions::default()
        }
    }
}

/// Result of a capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The capability produced nothing.
    None,
    /// Unclassified protocol output.
    Raw(RawResponse),
    /// Classified protocol output.
    Parsed(Response),
    /// Typed fields.
    Fields(Vec<FieldValue>),
    /// A yes/no answer.
    Flag(bool),
}

impl Reply {
    /// Whether this is [`Reply::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Reply::None)
    }

    /// Get the classified response if there is one.
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Reply::Parsed(response) => Some(response),
            _ => None,
        }
    }

    /// Get the raw response if there is one.
    pub fn as_raw(&self) -> Option<&RawResponse> {
        match self {
            Reply::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    /// Classify a raw reply for `command` with `chain`.
    ///
    /// Only [`Reply::Raw`] can be classified; anything else is malformed
    /// input for a classifier.
    pub fn classify(&self, command: &str, chain: &ParserChain) -> ProtocolResult<Reply> {
        match self {
            Reply::Raw(raw) => Ok(Reply::Parsed(chain.parse(command, raw)?)),
            other => Err(ProtocolError::MalformedResponse(format!(
                "cannot classify {:?} for {}",
                other, command
            ))),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Parsed(response)
    }
}

impl From<RawResponse> for Reply {
    fn from(raw: RawResponse) -> Self {
        Reply::Raw(raw)
    }
}
