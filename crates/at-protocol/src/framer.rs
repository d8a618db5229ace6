//! Response framing.
//!
//! A raw response is the untouched text the device produced for one command,
//! usually something like `"AT+CGMI\r\r\n+CGMI: VENDOR\r\n\r\nOK\r\n"`. Framing
//! turns it into ordered, non-empty lines and drops the leading echo of the
//! command if the device echoed it.

use crate::command::{echo_pattern, matches_at_start};

/// Response to a single protocol command, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    /// Multi-line text as read from the transport.
    Text(String),
    /// Already split into lines; framing leaves it untouched.
    Lines(Vec<String>),
}

impl RawResponse {
    /// Get the text if this is a textual response.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawResponse::Text(text) => Some(text),
            RawResponse::Lines(_) => None,
        }
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        RawResponse::Text(text.to_string())
    }
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        RawResponse::Text(text)
    }
}

impl From<Vec<String>> for RawResponse {
    fn from(lines: Vec<String>) -> Self {
        RawResponse::Lines(lines)
    }
}

/// Split `raw` into non-empty lines with the echo of `command` removed.
///
/// Only the first line is checked for an echo, and at most one line is
/// dropped. Structured responses are returned as they are.
pub fn frame(command: &str, raw: &RawResponse) -> Vec<String> {
    let text = match raw {
        RawResponse::Text(text) => text,
        RawResponse::Lines(lines) => return lines.clone(),
    };

    let mut lines: Vec<String> = text
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(first) = lines.first() {
        match echo_pattern(command) {
            Ok(pattern) if matches_at_start(&pattern, first) => {
                log::trace!("dropping echo line {:?}", first);
                lines.remove(0);
            }
            Ok(_) => {}
            Err(e) => log::debug!("no echo pattern for {:?}: {}", command, e),
        }
    }

    lines
}
