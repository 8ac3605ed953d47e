//! Line framing for the serial byte stream
//!
//! The serial peer emits one JSON object per line. Bytes arrive in arbitrary
//! chunks, so this module accumulates them into a bounded buffer and emits
//! complete lines on newline boundaries. Carriage returns are stripped, empty
//! lines are collapsed, and a line that would overflow the buffer is sacrificed
//! whole so the buffer can never grow without bound.

/// Default maximum accumulated line length in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 900;

/// Accumulates raw serial bytes into newline-delimited lines.
///
/// Pure state machine over a byte buffer: no parsing, no I/O. The buffer
/// length never exceeds the configured bound.
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    max_len: usize,
}

impl LineAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
        }
    }

    /// Feed one received byte; returns a complete line when one terminates.
    ///
    /// - `\r` is ignored.
    /// - `\n` flushes the buffer if non-empty; consecutive newlines collapse.
    /// - Any other byte appends while the buffer holds fewer than `max_len`
    ///   bytes, so a line of exactly the bound still gets through; one byte
    ///   past it discards the whole partial line. The data loss is deliberate:
    ///   the next line starts fresh and framing stays in sync.
    pub fn feed(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\r' => None,
            b'\n' => {
                if self.buf.is_empty() {
                    None
                } else {
                    let line = String::from_utf8_lossy(&self.buf).into_owned();
                    self.buf.clear();
                    Some(line)
                }
            }
            other => {
                if self.buf.len() < self.max_len {
                    self.buf.push(other);
                } else {
                    self.buf.clear();
                }
                None
            }
        }
    }

    /// Number of bytes currently buffered for the partial line.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}
