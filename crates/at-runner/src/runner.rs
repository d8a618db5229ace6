//! Scripted command runs.
//!
//! Each configured command is one of:
//!
//! - a raw AT command (`AT+CSQ`, `ATI`, `at+cgmr`), sent verbatim;
//! - a capability call, `name [args]`, with comma-separated arguments that
//!   are split and integer-coerced the same way device fields are.

use std::io::Write;
use std::time::Duration;

use at_protocol::{
    split, FieldValue, RawResponse, ReadOutcome, Response, Transport, DEFAULT_DELIMITER,
};
use at_wrapper::{CallOptions, CommandRegistry, ProviderSet, Reply, Session, WrapperResult};
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};

/// One parsed command entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Raw command sent as is.
    Send(String),
    /// Capability call resolved by the session.
    Call {
        /// Capability name.
        name: String,
        /// Call arguments.
        args: Vec<FieldValue>,
    },
}

impl Step {
    /// Parse a command entry.
    pub fn parse(entry: &str) -> Step {
        let entry = entry.trim();
        if is_raw_command(entry) {
            return Step::Send(entry.to_string());
        }

        match entry.split_once(char::is_whitespace) {
            Some((name, rest)) => Step::Call {
                name: name.to_string(),
                args: split(rest.trim(), DEFAULT_DELIMITER, true),
            },
            None => Step::Call {
                name: entry.to_string(),
                args: Vec::new(),
            },
        }
    }
}

/// `AT...` in upper case, or `at` followed by nothing or a non-name character.
fn is_raw_command(entry: &str) -> bool {
    if entry.starts_with("AT") {
        return true;
    }
    match entry.strip_prefix("at") {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_')),
        None => false,
    }
}

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands attempted.
    pub commands: usize,
    /// Commands answered without a device error.
    pub succeeded: usize,
    /// Commands that failed or were answered with an error line.
    pub failed: usize,
}

/// Render a reply on one line.
pub fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::None => "(no reply)".to_string(),
        Reply::Raw(RawResponse::Text(text)) => join_lines(text.lines()),
        Reply::Raw(RawResponse::Lines(lines)) => join_lines(lines.iter().map(String::as_str)),
        Reply::Parsed(Response::Empty) => "OK".to_string(),
        Reply::Parsed(Response::Data(lines)) | Reply::Parsed(Response::Unclassified(lines)) => {
            join_lines(lines.iter().map(String::as_str))
        }
        Reply::Parsed(Response::Failure(line)) => line.clone(),
        Reply::Fields(values) => values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(","),
        Reply::Flag(flag) => flag.to_string(),
    }
}

fn join_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Runs the configured commands against one session.
#[derive(Debug)]
pub struct Runner {
    session: Session,
    config: RunnerConfig,
}

impl Runner {
    /// Build the session described by `config`. No transport is attached yet.
    pub fn new(config: RunnerConfig) -> Self {
        let mut registry =
            CommandRegistry::from_set(ProviderSet::new().with_config(config.registry.clone()));
        registry.set_timeout(config.timeout());

        let mut session = Session::new(registry);
        if let Some(chain) = config.parser.chain() {
            session.push_parser(chain);
        }
        Runner { session, config }
    }

    /// Attach the device transport.
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        self.session.attach(transport);
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The underlying session, mutably; used to merge extra command sets.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// The configuration in use.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one command entry.
    pub fn step(&mut self, step: &Step) -> WrapperResult<Reply> {
        let options = CallOptions::default();
        match step {
            Step::Send(command) => self.session.send(command, &options),
            Step::Call { name, args } => self.session.call(name, args, &options),
        }
    }

    /// Probe the device, then run every configured command, writing one line
    /// per command to `out`.
    ///
    /// A failing command is reported and counted; the run continues.
    pub fn run<W: Write>(&mut self, out: &mut W) -> RunnerResult<RunSummary> {
        if self.config.probe_retries > 0 {
            if !self.session.probe(self.config.probe_retries)? {
                return Err(RunnerError::NoResponse(self.config.probe_retries));
            }
            info!("device answered the probe");
        }

        let mut summary = RunSummary::default();
        let entries = self.config.commands.clone();
        for entry in &entries {
            let step = Step::parse(entry);
            debug!("running {:?}", step);
            summary.commands += 1;

            match self.step(&step) {
                Ok(reply) => {
                    let failed = matches!(reply, Reply::Parsed(Response::Failure(_)));
                    if failed {
                        summary.failed += 1;
                    } else {
                        summary.succeeded += 1;
                    }
                    writeln!(out, "{} -> {}", entry, format_reply(&reply))?;
                }
                Err(e) => {
                    warn!("{} failed: {}", entry, e);
                    summary.failed += 1;
                    writeln!(out, "{} !! {}", entry, e)?;
                }
            }
        }

        info!(
            "{} commands, {} succeeded, {} failed",
            summary.commands, summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    /// Wait for an unsolicited line matching `pattern`.
    pub fn wait_for(&mut self, pattern: &str, timeout: Duration) -> RunnerResult<ReadOutcome> {
        let outcome = self.session.read_until(pattern, timeout)?;
        if outcome.matched() {
            info!("matched {:?}", pattern);
        } else {
            warn!("no line matching {:?} within {:?}", pattern, timeout);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_commands() {
        assert_eq!(Step::parse("AT+CSQ"), Step::Send("AT+CSQ".to_string()));
        assert_eq!(Step::parse(" ATI "), Step::Send("ATI".to_string()));
        assert_eq!(Step::parse("at+cgmr"), Step::Send("at+cgmr".to_string()));
        assert_eq!(Step::parse("at"), Step::Send("at".to_string()));
    }

    #[test]
    fn test_parse_calls() {
        assert_eq!(
            Step::parse("cops 0, 2"),
            Step::Call {
                name: "cops".to_string(),
                args: vec![FieldValue::Int(0), FieldValue::Int(2)],
            }
        );
        assert_eq!(
            Step::parse("sendSms \"hi there\",hello"),
            Step::Call {
                name: "sendSms".to_string(),
                args: vec![FieldValue::from("hi there"), FieldValue::from("hello")],
            }
        );
        assert_eq!(
            Step::parse("attach"),
            Step::Call {
                name: "attach".to_string(),
                args: Vec::new(),
            }
        );
    }

    #[test]
    fn test_format_reply() {
        assert_eq!(format_reply(&Reply::None), "(no reply)");
        assert_eq!(
            format_reply(&Reply::Raw(RawResponse::Text("AT\r\r\nOK\r\n".to_string()))),
            "AT | OK"
        );
        assert_eq!(format_reply(&Reply::Parsed(Response::Empty)), "OK");
        assert_eq!(
            format_reply(&Reply::Parsed(Response::Data(vec![
                "20,99".to_string(),
                "x".to_string()
            ]))),
            "20,99 | x"
        );
        assert_eq!(
            format_reply(&Reply::Fields(vec![FieldValue::Int(1), FieldValue::from("a")])),
            "1,a"
        );
        assert_eq!(format_reply(&Reply::Flag(false)), "false");
    }
}
