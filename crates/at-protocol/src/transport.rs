//! Character-stream transports.
//!
//! A [`Transport`] moves whole lines: `write` sends one command line and
//! `read` returns at most one received line, or `None` when nothing arrived
//! within the transport's current timeout. The timeout is shared state that
//! blocking helpers override temporarily through [`TimeoutOverride`].

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use crate::codec::LineCodec;
use crate::error::{ProtocolError, ProtocolResult};

/// Smallest timeout handed to a socket; zero means "block forever" there.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

/// Per-call I/O options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoOptions {
    /// Suppress logging of this exchange (used while probing).
    pub quiet: bool,
}

impl IoOptions {
    /// Options with logging suppressed.
    pub fn quiet() -> Self {
        IoOptions { quiet: true }
    }
}

/// A line-oriented link to a device.
pub trait Transport {
    /// Send `line` as is; the caller supplies the terminator.
    fn write(&mut self, line: &str, options: &IoOptions) -> ProtocolResult<()>;

    /// Read one line, terminator included, waiting at most [`Transport::timeout`].
    fn read(&mut self, options: &IoOptions) -> ProtocolResult<Option<String>>;

    /// Current per-read timeout.
    fn timeout(&self) -> Duration;

    /// Replace the per-read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> ProtocolResult<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, line: &str, options: &IoOptions) -> ProtocolResult<()> {
        (**self).write(line, options)
    }

    fn read(&mut self, options: &IoOptions) -> ProtocolResult<Option<String>> {
        (**self).read(options)
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> ProtocolResult<()> {
        (**self).set_timeout(timeout)
    }
}

/// Overrides a transport's timeout and restores the previous value on drop.
///
/// Restoration happens on every exit path of the borrowing scope, including
/// early returns through `?`.
pub struct TimeoutOverride<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    previous: Duration,
}

impl<'a, T: Transport + ?Sized> TimeoutOverride<'a, T> {
    /// Save the current timeout of `transport` and replace it with `timeout`.
    pub fn new(transport: &'a mut T, timeout: Duration) -> ProtocolResult<Self> {
        let previous = transport.timeout();
        transport.set_timeout(timeout)?;
        Ok(TimeoutOverride {
            transport,
            previous,
        })
    }

    /// The timeout that will be restored.
    pub fn previous(&self) -> Duration {
        self.previous
    }
}

impl<T: Transport + ?Sized> Deref for TimeoutOverride<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for TimeoutOverride<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport + ?Sized> Drop for TimeoutOverride<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.set_timeout(self.previous) {
            log::warn!("failed to restore transport timeout {:?}: {}", self.previous, e);
        }
    }
}

// ============================================================================
// TCP transport
// ============================================================================

/// Transport over a TCP socket, e.g. a serial port exposed by a terminal
/// server or a simulated modem.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    codec: LineCodec,
    timeout: Duration,
    peer: String,
}

impl TcpTransport {
    /// Connect to `addr` with `timeout` as the initial read timeout.
    pub fn connect<A: ToSocketAddrs + std::fmt::Debug>(
        addr: A,
        timeout: Duration,
    ) -> ProtocolResult<Self> {
        let peer = format!("{:?}", addr);
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        log::debug!("connected to {}", peer);

        Ok(TcpTransport {
            stream,
            codec: LineCodec::new(),
            timeout,
            peer,
        })
    }

    /// Description of the remote end.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, line: &str, options: &IoOptions) -> ProtocolResult<()> {
        if !options.quiet {
            log::debug!("{} <- {:?}", self.peer, line);
        }
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    fn read(&mut self, options: &IoOptions) -> ProtocolResult<Option<String>> {
        let start = Instant::now();
        let mut buf = [0u8; 256];

        loop {
            if let Some(line) = self.codec.decode_line() {
                if !options.quiet {
                    log::debug!("{} -> {:?}", self.peer, line);
                }
                return Ok(Some(line));
            }

            if start.elapsed() >= self.timeout {
                return Ok(None);
            }

            match self.stream.read(&mut buf) {
                Ok(0) => return Err(ProtocolError::NotConnected),
                Ok(n) => self.codec.push(&buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> ProtocolResult<()> {
        self.stream
            .set_read_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        self.timeout = timeout;
        Ok(())
    }
}

// ============================================================================
// Scripted transport
// ============================================================================

/// One step of a [`ScriptedTransport`] script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// The next read returns this line.
    Line(String),
    /// The next read returns nothing, immediately.
    Silence,
    /// The next read fails with a transport error.
    Fault(String),
}

/// In-memory transport replaying a script.
///
/// Reads consume the script in order. Once the script is exhausted, reads
/// block for the current timeout and return nothing, like an idle line.
/// Writes are recorded, and a write matching a registered command queues
/// that command's reply lines.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: VecDeque<ScriptStep>,
    replies: Vec<(String, Vec<String>)>,
    written: Vec<String>,
    timeout: Duration,
    timeout_history: Vec<Duration>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        ScriptedTransport::new()
    }
}

impl ScriptedTransport {
    /// Create an empty script with a one second timeout.
    pub fn new() -> Self {
        ScriptedTransport {
            script: VecDeque::new(),
            replies: Vec::new(),
            written: Vec::new(),
            timeout: Duration::from_secs(1),
            timeout_history: Vec::new(),
        }
    }

    /// Queue a line to be read.
    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.script.push_back(ScriptStep::Line(line.into()));
        self
    }

    /// Queue an empty read.
    pub fn push_silence(&mut self) -> &mut Self {
        self.script.push_back(ScriptStep::Silence);
        self
    }

    /// Queue a failing read.
    pub fn push_fault(&mut self, message: impl Into<String>) -> &mut Self {
        self.script.push_back(ScriptStep::Fault(message.into()));
        self
    }

    /// Reply with `lines` whenever `command` (without terminator) is written.
    pub fn on_command(&mut self, command: &str, lines: &[&str]) -> &mut Self {
        self.replies.push((
            command.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        ));
        self
    }

    /// Lines written so far, terminators included.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Every timeout set so far, in order.
    pub fn timeout_history(&self) -> &[Duration] {
        &self.timeout_history
    }

    /// Number of unread script steps.
    pub fn pending(&self) -> usize {
        self.script.len()
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, line: &str, options: &IoOptions) -> ProtocolResult<()> {
        if !options.quiet {
            log::trace!("script <- {:?}", line);
        }
        let command = line.trim_end_matches(['\r', '\n']);
        if let Some((_, lines)) = self.replies.iter().find(|(c, _)| c == command) {
            for reply in lines.clone() {
                self.script.push_back(ScriptStep::Line(reply));
            }
        }
        self.written.push(line.to_string());
        Ok(())
    }

    fn read(&mut self, _options: &IoOptions) -> ProtocolResult<Option<String>> {
        match self.script.pop_front() {
            Some(ScriptStep::Line(line)) => Ok(Some(line)),
            Some(ScriptStep::Silence) => Ok(None),
            Some(ScriptStep::Fault(message)) => Err(ProtocolError::Transport(message)),
            None => {
                std::thread::sleep(self.timeout);
                Ok(None)
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> ProtocolResult<()> {
        self.timeout = timeout;
        self.timeout_history.push(timeout);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_override_restores() {
        let mut transport = ScriptedTransport::new();
        transport.set_timeout(Duration::from_secs(3)).unwrap();
        {
            let guard = TimeoutOverride::new(&mut transport, Duration::from_millis(50)).unwrap();
            assert_eq!(guard.timeout(), Duration::from_millis(50));
            assert_eq!(guard.previous(), Duration::from_secs(3));
        }
        assert_eq!(transport.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_override_restores_on_error_path() {
        fn failing_read(transport: &mut ScriptedTransport) -> ProtocolResult<Option<String>> {
            let mut guard = TimeoutOverride::new(transport, Duration::from_millis(10))?;
            guard.read(&IoOptions::default())
        }

        let mut transport = ScriptedTransport::new();
        transport.push_fault("line dropped");
        assert!(failing_read(&mut transport).is_err());
        assert_eq!(transport.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_scripted_replies_to_commands() {
        let mut transport = ScriptedTransport::new();
        transport.on_command("AT+CGMI", &["AT+CGMI\r\n", "VENDOR\r\n", "OK\r\n"]);
        transport.write("AT+CGMI\r", &IoOptions::default()).unwrap();

        assert_eq!(transport.written(), &["AT+CGMI\r".to_string()]);
        assert_eq!(transport.pending(), 3);
        assert_eq!(
            transport.read(&IoOptions::default()).unwrap(),
            Some("AT+CGMI\r\n".to_string())
        );
    }

    #[test]
    fn test_scripted_silence_and_exhaustion() {
        let mut transport = ScriptedTransport::new();
        transport.set_timeout(Duration::from_millis(5)).unwrap();
        transport.push_silence();
        assert_eq!(transport.read(&IoOptions::default()).unwrap(), None);

        let start = Instant::now();
        assert_eq!(transport.read(&IoOptions::default()).unwrap(), None);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
