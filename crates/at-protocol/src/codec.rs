//! Line codec for byte-stream transports.
//!
//! Devices answer with CR/LF terminated lines, often with the terminator
//! split across reads. The codec accumulates received bytes and hands out
//! one complete line at a time, terminator included, so the read loop can
//! keep the response text exactly as the device sent it.

use bytes::BytesMut;

/// Maximum line length kept in the buffer before it is flushed as a line.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Accumulates bytes and splits them into lines.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// The returned line keeps its terminator: a lone `\r` or `\n`, or a
    /// `\r\n` pair. A `\r` at the very end of the buffer is held back until
    /// the next byte shows whether a `\n` follows. Returns `None` if more
    /// data is needed.
    pub fn decode_line(&mut self) -> Option<String> {
        let end = self
            .buffer
            .iter()
            .position(|&byte| byte == b'\r' || byte == b'\n');

        let end = match end {
            Some(i) if self.buffer[i] == b'\r' => {
                if i + 1 == self.buffer.len() {
                    // Wait for a possible '\n'.
                    return self.flush_overlong();
                }
                if self.buffer[i + 1] == b'\n' {
                    i + 2
                } else {
                    i + 1
                }
            }
            Some(i) => i + 1,
            None => return self.flush_overlong(),
        };

        let line = self.buffer.split_to(end);
        Some(String::from_utf8_lossy(&line).to_string())
    }

    /// Emit the whole buffer as a line if it grew past [`MAX_LINE_LENGTH`].
    fn flush_overlong(&mut self) -> Option<String> {
        if self.buffer.len() < MAX_LINE_LENGTH {
            return None;
        }
        log::debug!("flushing {} buffered bytes without terminator", self.buffer.len());
        let line = self.buffer.split();
        Some(String::from_utf8_lossy(&line).to_string())
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}
