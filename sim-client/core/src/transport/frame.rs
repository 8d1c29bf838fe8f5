//! Line Framing
//!
//! Wire format for simulator messages: one JSON object per line.
//!
//! # Frame Format
//!
//! ```text
//! {"msg_type":"telemetry","x":1.5,"z":-3.0,"speed":2.1}\n
//! {"msg_type":"control","steering":"0.0","throttle":"0.3","brake":"0.0"}\n
//! ```
//!
//! The simulator may emit stray bytes (partial writes, BOMs, keep-alive
//! whitespace) between objects. The decoder skips everything before the
//! first `{` of a line and drops lines that are too short to hold an object.
//!
//! # Limits
//!
//! - A line that grows past the configured maximum without a terminator
//!   is rejected with `TransportError::FrameTooLarge`
//! - The buffer is compacted once more than half of it has been consumed

use super::TransportError;
use crate::messages::{decode_message, StructuredMessage};

/// Default maximum line size (1 MB)
pub const MAX_LINE_SIZE: usize = 1024 * 1024;

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Line terminator between messages
const LINE_TERMINATOR: u8 = b'\n';

/// Terminate an encoded payload so the peer can split the stream
#[must_use]
pub fn encode_line(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.extend_from_slice(payload);
    buf.push(LINE_TERMINATOR);
    buf
}

/// Decoder state machine for newline-delimited JSON
///
/// Buffers incoming bytes and yields complete messages.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    max_line_size: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Create a new decoder with the default line limit
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_size(MAX_LINE_SIZE)
    }

    /// Create a decoder with a custom line limit
    #[must_use]
    pub fn with_max_line_size(max_line_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            max_line_size,
        }
    }

    /// Append bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next message
    ///
    /// Returns:
    /// - `Ok(Some(msg))` if a complete line held a JSON object
    /// - `Ok(None)` if more data is needed
    /// - `Err(TransportError::SerializationError)` if a complete line did
    ///   not parse as a JSON object (the line is consumed, decoding can continue)
    /// - `Err(TransportError::FrameTooLarge)` if the pending line exceeds
    ///   the limit
    pub fn decode(&mut self) -> Result<Option<StructuredMessage>, TransportError> {
        loop {
            let pending = &self.buffer[self.read_pos..];

            let Some(line_len) = pending.iter().position(|&b| b == LINE_TERMINATOR) else {
                if pending.len() > self.max_line_size {
                    return Err(TransportError::FrameTooLarge {
                        size: pending.len(),
                        max: self.max_line_size,
                    });
                }
                return Ok(None);
            };

            let line_start = self.read_pos;
            self.read_pos += line_len + 1;

            if line_len > self.max_line_size {
                return Err(TransportError::FrameTooLarge {
                    size: line_len,
                    max: self.max_line_size,
                });
            }

            let line = &self.buffer[line_start..line_start + line_len];
            let Some(object_start) = line.iter().position(|&b| b == b'{') else {
                continue;
            };
            let line = line[object_start..].trim_ascii_end();
            if line.len() <= 2 {
                continue;
            }

            return decode_message(line)
                .map(Some)
                .map_err(|e| TransportError::SerializationError(e.to_string()));
        }
    }
}
