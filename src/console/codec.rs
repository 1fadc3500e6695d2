//! Line codec for server console output.
//!
//! Console output is plain text, not a structured protocol, so the decoder
//! never rejects input: invalid UTF-8 is replaced lossily and overlong lines
//! are cut into [`MAX_LINE_BYTES`] chunks instead of failing the stream.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use minecloud_wrapper::console::codec::ConsoleCodec;
//!
//! let lines = FramedRead::new(child_stdout, ConsoleCodec::new());
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::{AppError, Result};

/// Longest line the codec yields as a single item: 64 KiB.
///
/// Longer lines are emitted as consecutive chunks of this size so a process
/// that never writes a newline cannot grow the read buffer without bound.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Newline-delimited decoder for console streams.
///
/// A trailing `\r` is stripped from each line. At EOF an unterminated final
/// line is still yielded.
#[derive(Debug, Default)]
pub struct ConsoleCodec {
    /// Bytes of the buffer already searched for a newline.
    next_index: usize,
}

impl ConsoleCodec {
    /// Create a codec with an empty search position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ConsoleCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // A line of exactly MAX_LINE_BYTES may still have its newline at the
        // next position.
        let limit = src.len().min(MAX_LINE_BYTES + 1);
        let start = self.next_index.min(limit);

        if let Some(offset) = src[start..limit].iter().position(|b| *b == b'\n') {
            let newline = start + offset;
            self.next_index = 0;
            let line = src.split_to(newline + 1);
            return Ok(Some(to_line(&line[..newline])));
        }

        if src.len() > MAX_LINE_BYTES {
            self.next_index = 0;
            let chunk = src.split_to(MAX_LINE_BYTES);
            return Ok(Some(to_line(&chunk)));
        }

        self.next_index = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }

        let rest = src.split_to(src.len());
        Ok(Some(to_line(&rest)))
    }
}

/// Convert raw line bytes into text, dropping a trailing carriage return.
fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
