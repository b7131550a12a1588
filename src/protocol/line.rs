//! Streaming line decoder for the newline-terminated text protocol
//!
//! Wire format: UTF-8 text, one message per `\n`-terminated line. A `\r`
//! preceding the delimiter is stripped together with it, so `\r\n` vanishes
//! entirely rather than being converted to `\n`. Bytes arriving without a
//! delimiter are buffered until the rest of the line shows up, so a line
//! split across several transport reads decodes the same as one read.

use bytes::{Buf, BytesMut};

use crate::error::{ChatError, Result};

/// Maximum length of a single line in bytes (delimiter excluded)
pub const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024;

/// Line encoder/decoder for streaming use
#[derive(Debug)]
pub struct LineCodec {
    buffer: BytesMut,
    max_line_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new line codec with the default line length limit
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a new line codec with a specific line length limit
    pub fn with_max_len(max_line_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_line_len,
        }
    }

    /// Feed data into the codec
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next complete line
    ///
    /// Returns `Ok(Some(line))` with the delimiter (and any preceding `\r`)
    /// stripped, `Ok(None)` if more data is needed, or an error if the line
    /// exceeds the length limit or is not valid UTF-8.
    pub fn decode_next(&mut self) -> Result<Option<String>> {
        let delim = match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => {
                if self.buffer.len() > self.max_line_len {
                    return Err(ChatError::protocol(format!(
                        "Line too long: {} bytes buffered (max: {})",
                        self.buffer.len(),
                        self.max_line_len
                    )));
                }
                return Ok(None);
            }
        };

        if delim > self.max_line_len {
            return Err(ChatError::protocol(format!(
                "Line too long: {} bytes (max: {})",
                delim, self.max_line_len
            )));
        }

        let mut line = self.buffer.split_to(delim);
        self.buffer.advance(1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        let text = std::str::from_utf8(&line)
            .map_err(|e| ChatError::protocol(format!("Invalid UTF-8 in line: {}", e)))?;

        Ok(Some(text.to_string()))
    }

    /// Get the current buffer length
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}
