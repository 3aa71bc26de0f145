//! Async line reader.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::error::ProtocolError;
use crate::line::{Line, LINE_TERMINATOR};

/// Splits a byte stream into [`Line`]s.
///
/// Reads are buffered; a line is yielded only after its terminator has
/// arrived. Bytes left over when the stream ends are reported as
/// [`ProtocolError::Unterminated`] and never yielded as a line.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_line_length: Option<usize>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader with no line length limit.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max_line_length: None,
        }
    }

    /// Limits the number of bytes before the terminator.
    pub fn with_max_line_length(mut self, max: Option<usize>) -> Self {
        self.max_line_length = max;
        self
    }

    /// Reads the next complete line.
    ///
    /// Returns `Ok(None)` on a clean end of stream at a line boundary.
    ///
    /// Cancel-safe: if the future is dropped mid-line, the bytes read so far
    /// stay buffered and the next call continues the same line.
    pub async fn read_line(&mut self) -> Result<Option<Line>, ProtocolError> {
        // One extra byte leaves room for the terminator itself. A limit too
        // large to represent is treated as no limit.
        let limit = self
            .max_line_length
            .and_then(|max| u64::try_from(max).ok())
            .and_then(|max| max.checked_add(1))
            .map(|max| max.saturating_sub(self.buf.len() as u64))
            .unwrap_or(u64::MAX);

        (&mut self.reader)
            .take(limit)
            .read_until(LINE_TERMINATOR, &mut self.buf)
            .await?;

        if self.buf.is_empty() {
            return Ok(None);
        }

        if self.buf.last() != Some(&LINE_TERMINATOR) {
            let len = std::mem::take(&mut self.buf).len();
            if let Some(max) = self.max_line_length {
                if len > max {
                    return Err(ProtocolError::LineTooLong { max });
                }
            }
            return Err(ProtocolError::Unterminated { len });
        }

        Ok(Some(Line::from_frame(std::mem::take(&mut self.buf))))
    }
}
