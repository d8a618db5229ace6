//! Response classification.
//!
//! Framed lines are refined by a chain of classifier stages:
//!
//! - [`Raw`]: leaves the framed lines as they are.
//! - [`DataOnly`]: looks at the final result line. `ERROR`, `+CME ERROR` and
//!   `+CMS ERROR` make the response a failure carrying that line; `OK` makes
//!   it a success carrying every line before it.
//! - [`SimpleData`]: on success, reduces `+NAME: payload` lines to `payload`.
//!
//! Stages are plain values applied in order by a [`ParserChain`].

use crate::command::data_prefix_pattern;
use crate::error::ProtocolResult;
use crate::framer::{frame, RawResponse};

/// Line prefixes of final error results.
pub const ERROR_PREFIXES: [&str; 3] = ["ERROR", "+CME ERROR", "+CMS ERROR"];

/// Line prefix of the final success result.
pub const OK_PREFIX: &str = "OK";

/// Pattern matching any line that ends a command's response.
pub const FINAL_RESULT_PATTERN: &str = r"^(OK|ERROR|\+CME ERROR|\+CMS ERROR|NO CARRIER)";

/// Whether `line` is a final error result.
pub fn is_error_line(line: &str) -> bool {
    ERROR_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Whether `line` is a final `OK` result.
pub fn is_ok_line(line: &str) -> bool {
    line.starts_with(OK_PREFIX)
}

/// Classified response to a protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success without data lines.
    Empty,

    /// Success with data lines; the final `OK` is not included.
    Data(Vec<String>),

    /// The device reported an error. Holds the error line verbatim.
    Failure(String),

    /// Lines whose outcome could not be determined.
    Unclassified(Vec<String>),
}

impl Response {
    /// Build the initial, unrefined response for framed lines.
    pub fn from_lines(lines: Vec<String>) -> Response {
        if lines.is_empty() {
            Response::Empty
        } else {
            Response::Unclassified(lines)
        }
    }

    /// Check if this is a success response (with or without data).
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Empty | Response::Data(_))
    }

    /// Check if this is a failure response.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Failure(_))
    }

    /// Get the failure line if this is a failure.
    pub fn as_failure(&self) -> Option<&str> {
        match self {
            Response::Failure(line) => Some(line),
            _ => None,
        }
    }

    /// Get the lines carried by this response.
    ///
    /// A failure yields its single line, an empty success no lines.
    pub fn lines(&self) -> &[String] {
        match self {
            Response::Empty => &[],
            Response::Data(lines) | Response::Unclassified(lines) => lines,
            Response::Failure(line) => std::slice::from_ref(line),
        }
    }
}

/// One stage of a classifier chain.
pub trait Classifier: Send + Sync {
    /// Short stage name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Refine `response` produced by the previous stages for `command`.
    fn refine(&self, command: &str, response: Response) -> ProtocolResult<Response>;
}

/// Identity stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Classifier for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn refine(&self, _command: &str, response: Response) -> ProtocolResult<Response> {
        Ok(response)
    }
}

/// Final result line detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataOnly;

impl Classifier for DataOnly {
    fn name(&self) -> &'static str {
        "data_only"
    }

    fn refine(&self, _command: &str, response: Response) -> ProtocolResult<Response> {
        let mut lines = match response {
            Response::Unclassified(lines) => lines,
            other => return Ok(other),
        };

        let Some(last) = lines.last() else {
            return Ok(Response::Empty);
        };

        if is_error_line(last) {
            let line = lines.pop().unwrap_or_default();
            return Ok(Response::Failure(line));
        }

        if is_ok_line(last) {
            lines.pop();
            return Ok(if lines.is_empty() {
                Response::Empty
            } else {
                Response::Data(lines)
            });
        }

        Ok(Response::Unclassified(lines))
    }
}

/// `+NAME: payload` reduction on successful data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleData;

impl Classifier for SimpleData {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn refine(&self, command: &str, response: Response) -> ProtocolResult<Response> {
        let lines = match response {
            Response::Data(lines) => lines,
            other => return Ok(other),
        };

        let pattern = data_prefix_pattern(command)?;
        let lines = lines
            .into_iter()
            .map(|line| match pattern.captures(&line) {
                Some(caps) => caps[1].to_string(),
                None => line,
            })
            .collect();

        Ok(Response::Data(lines))
    }
}

/// An ordered list of classifier stages.
pub struct ParserChain {
    stages: Vec<Box<dyn Classifier>>,
}

impl ParserChain {
    /// Create a chain from explicit stages.
    pub fn new(stages: Vec<Box<dyn Classifier>>) -> Self {
        ParserChain { stages }
    }

    /// Framing only.
    pub fn raw() -> Self {
        ParserChain::new(vec![Box::new(Raw)])
    }

    /// Framing plus final result detection.
    pub fn data_only() -> Self {
        ParserChain::new(vec![Box::new(Raw), Box::new(DataOnly)])
    }

    /// Framing, final result detection and data prefix reduction.
    pub fn simple() -> Self {
        ParserChain::new(vec![Box::new(Raw), Box::new(DataOnly), Box::new(SimpleData)])
    }

    /// Names of the stages, in application order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Frame `raw` and run every stage over the result.
    pub fn parse(&self, command: &str, raw: &RawResponse) -> ProtocolResult<Response> {
        let mut response = Response::from_lines(frame(command, raw));
        for stage in &self.stages {
            response = stage.refine(command, response)?;
        }
        Ok(response)
    }
}

impl std::fmt::Debug for ParserChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}
