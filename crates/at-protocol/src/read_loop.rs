//! Timeout-bounded reads.
//!
//! [`read_until`] keeps reading lines until one matches a pattern at its
//! start, or until the overall deadline passes. Each individual read is
//! bounded by a tenth of the overall timeout, and the transport's own timeout
//! is restored afterwards whatever the outcome.

use std::time::{Duration, Instant};

use regex::Regex;

use crate::command::matches_at_start;
use crate::error::ProtocolResult;
use crate::transport::{IoOptions, TimeoutOverride, Transport};

/// Per-attempt timeout used by [`probe`].
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Line written by [`probe`].
pub const PROBE_COMMAND: &str = "at\r";

/// Number of per-read slices the overall timeout is divided into.
const READ_SLICES: u32 = 10;

/// Result of [`read_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Everything read, in order, terminators included.
    pub text: String,
    /// The line that matched, or `None` if the deadline passed first.
    pub last_line: Option<String>,
}

impl ReadOutcome {
    /// Whether the pattern was seen before the deadline.
    pub fn matched(&self) -> bool {
        self.last_line.is_some()
    }
}

/// Read lines until `pattern` matches the start of one, or `timeout` elapses.
///
/// Empty reads do not reset the deadline. On timeout the text read so far is
/// still returned, with `last_line` set to `None`.
pub fn read_until<T: Transport + ?Sized>(
    transport: &mut T,
    pattern: &Regex,
    timeout: Duration,
) -> ProtocolResult<ReadOutcome> {
    let mut transport = TimeoutOverride::new(transport, timeout / READ_SLICES)?;
    let start = Instant::now();
    let mut text = String::new();

    loop {
        if start.elapsed() >= timeout {
            log::debug!(
                "no line matching {:?} within {:?} ({} bytes read)",
                pattern.as_str(),
                timeout,
                text.len()
            );
            return Ok(ReadOutcome {
                text,
                last_line: None,
            });
        }

        let Some(line) = transport.read(&IoOptions::default())? else {
            continue;
        };

        text.push_str(&line);
        if matches_at_start(pattern, &line) {
            log::trace!("matched {:?} after {:?}", pattern.as_str(), start.elapsed());
            return Ok(ReadOutcome {
                text,
                last_line: Some(line),
            });
        }
    }
}

/// [`read_until`] with a pattern given as a string.
pub fn read_until_str<T: Transport + ?Sized>(
    transport: &mut T,
    pattern: &str,
    timeout: Duration,
) -> ProtocolResult<ReadOutcome> {
    let pattern = Regex::new(pattern)?;
    read_until(transport, &pattern, timeout)
}

/// Check whether anything answers on `transport`.
///
/// Sends `at` up to `2 * retry` times with logging suppressed and succeeds on
/// the first line read back. The response content is not inspected.
pub fn probe<T: Transport + ?Sized>(transport: &mut T, retry: u32) -> ProtocolResult<bool> {
    let mut transport = TimeoutOverride::new(transport, PROBE_TIMEOUT)?;
    let quiet = IoOptions::quiet();

    for attempt in 0..retry.saturating_mul(2) {
        transport.write(PROBE_COMMAND, &quiet)?;
        if transport.read(&quiet)?.is_some() {
            log::debug!("interface answered on attempt {}", attempt + 1);
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    #[test]
    fn test_read_until_match() {
        let mut transport = ScriptedTransport::new();
        transport
            .push_line("ring")
            .push_silence()
            .push_line("CONNECT");

        let pattern = Regex::new("^CONNECT").unwrap();
        let start = Instant::now();
        let outcome = read_until(&mut transport, &pattern, Duration::from_secs(5)).unwrap();

        assert_eq!(outcome.last_line.as_deref(), Some("CONNECT"));
        assert!(outcome.text.contains("ring"));
        assert!(outcome.text.contains("CONNECT"));
        assert!(outcome.matched());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_read_until_timeout_keeps_partial_text() {
        let mut transport = ScriptedTransport::new();
        transport.push_line("+CREG: 2\r\n");

        let timeout = Duration::from_millis(200);
        let start = Instant::now();
        let outcome = read_until_str(&mut transport, "^OK", timeout).unwrap();

        assert!(start.elapsed() >= timeout);
        assert_eq!(outcome.last_line, None);
        assert_eq!(outcome.text, "+CREG: 2\r\n");
        assert_eq!(transport.timeout(), Duration::from_secs(1));
        assert_eq!(
            transport.timeout_history(),
            &[Duration::from_millis(20), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_read_until_silence_does_not_extend_deadline() {
        let mut transport = ScriptedTransport::new();
        for _ in 0..10_000 {
            transport.push_silence();
        }

        let timeout = Duration::from_millis(100);
        let start = Instant::now();
        let outcome = read_until_str(&mut transport, "^OK", timeout).unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(1));
        assert_eq!(outcome.last_line, None);
        assert!(outcome.text.is_empty());
        assert_eq!(transport.timeout(), Duration::from_secs(1));
        assert_eq!(
            transport.timeout_history(),
            &[Duration::from_millis(10), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_read_until_restores_timeout() {
        let mut transport = ScriptedTransport::new();
        transport.set_timeout(Duration::from_secs(2)).unwrap();
        transport.push_line("OK\r\n");

        read_until_str(&mut transport, "^OK", Duration::from_secs(1)).unwrap();

        assert_eq!(transport.timeout(), Duration::from_secs(2));
        assert_eq!(
            transport.timeout_history(),
            &[
                Duration::from_secs(2),
                Duration::from_millis(100),
                Duration::from_secs(2),
            ]
        );
    }

    #[test]
    fn test_read_until_restores_timeout_on_fault() {
        let mut transport = ScriptedTransport::new();
        transport.push_line("ring").push_fault("port closed");

        let result = read_until_str(&mut transport, "^OK", Duration::from_secs(1));

        assert!(result.is_err());
        assert_eq!(transport.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_read_until_match_is_anchored() {
        let mut transport = ScriptedTransport::new();
        transport.push_line("NO CONNECT").push_line("CONNECT 115200");

        let outcome = read_until_str(&mut transport, "CONNECT", Duration::from_secs(1)).unwrap();
        assert_eq!(outcome.last_line.as_deref(), Some("CONNECT 115200"));
        assert_eq!(outcome.text, "NO CONNECTCONNECT 115200");
    }

    #[test]
    fn test_invalid_pattern() {
        let mut transport = ScriptedTransport::new();
        assert!(read_until_str(&mut transport, "(", Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_probe_answers() {
        let mut transport = ScriptedTransport::new();
        transport.push_silence().push_line("OK\r\n");

        assert!(probe(&mut transport, 3).unwrap());
        assert_eq!(transport.written().len(), 2);
        assert_eq!(transport.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_probe_gives_up() {
        let mut transport = ScriptedTransport::new();
        for _ in 0..4 {
            transport.push_silence();
        }

        assert!(!probe(&mut transport, 2).unwrap());
        assert_eq!(transport.written(), &["at\r"; 4]);
    }
}
