//! Errors produced while reading lines from a peer.

use thiserror::Error;

/// Errors that end a peer's read loop.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a line.
    ///
    /// The partial bytes are discarded; a line is only complete once its
    /// terminator has been seen.
    #[error("stream ended with {len} unterminated bytes")]
    Unterminated { len: usize },

    /// A line exceeded the configured maximum length.
    #[error("line too long (max: {max} bytes)")]
    LineTooLong { max: usize },
}

impl ProtocolError {
    /// Returns true if the error is an ordinary end of stream rather than a
    /// transport failure.
    pub fn is_eof_like(&self) -> bool {
        matches!(self, Self::Unterminated { .. })
    }
}
