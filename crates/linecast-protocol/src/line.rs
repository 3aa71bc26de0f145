//! A single relayed message.

use std::fmt;

/// Wire terminator appended to every outbound line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// One message, stored without its terminator.
///
/// The content is byte-transparent: nothing requires it to be UTF-8.
/// Because `\n` is the frame delimiter a line can never contain one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Line(Vec<u8>);

impl Line {
    /// Creates a line from raw bytes, truncating at the first `\n`.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        if let Some(pos) = bytes.iter().position(|b| *b == LINE_TERMINATOR) {
            bytes.truncate(pos);
        }
        Self(bytes)
    }

    /// Builds a line from a frame read off the wire.
    ///
    /// Strips the trailing `\n` and, if present, one `\r` before it so
    /// CRLF clients relay cleanly.
    pub(crate) fn from_frame(mut frame: Vec<u8>) -> Self {
        if frame.last() == Some(&LINE_TERMINATOR) {
            frame.pop();
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }
        }
        Self(frame)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encodes the line for the wire, terminator included.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.0.len() + 1);
        wire.extend_from_slice(&self.0);
        wire.push(LINE_TERMINATOR);
        wire
    }
}

/// Lossy UTF-8 rendering, for logs.
impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl From<String> for Line {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}
