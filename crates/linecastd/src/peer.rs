//! Connection handles shared between a peer's worker and the broadcaster.
//!
//! A [`PeerHandle`] is the write side of one accepted connection plus its
//! identity. The read side stays with the connection worker. Either party
//! may close the handle; only the first close does any work.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use linecast_core::{PeerAddr, PeerId, PeerInfo};

/// Type-erased write half of a peer's stream.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Errors from writing to a single peer.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("peer is closed")]
    Closed,
}

struct PeerInner {
    info: PeerInfo,
    writer: Mutex<BufWriter<BoxedWriter>>,
    closed: AtomicBool,
    close_signal: CancellationToken,
}

/// Cheap-to-clone handle to a connected peer.
///
/// Equality is identity: two handles are equal when they carry the same
/// [`PeerId`].
#[derive(Clone)]
pub struct PeerHandle {
    inner: Arc<PeerInner>,
}

impl PeerHandle {
    /// Wraps the write half of a connection.
    ///
    /// `close_signal` is cancelled when the handle is closed. Passing a child
    /// of the server's shutdown token makes shutdown close every peer.
    pub fn new<W>(info: PeerInfo, writer: W, close_signal: CancellationToken) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: BoxedWriter = Box::new(writer);
        Self {
            inner: Arc::new(PeerInner {
                info,
                writer: Mutex::new(BufWriter::new(writer)),
                closed: AtomicBool::new(false),
                close_signal,
            }),
        }
    }

    pub fn id(&self) -> PeerId {
        self.inner.info.id
    }

    pub fn addr(&self) -> &PeerAddr {
        &self.inner.info.addr
    }

    pub fn info(&self) -> &PeerInfo {
        &self.inner.info
    }

    /// Writes bytes already framed for the wire and flushes them.
    ///
    /// Callers frame with [`linecast_protocol::Line::to_wire`] once and reuse
    /// the bytes for every peer.
    ///
    /// Concurrent senders are serialized per peer so lines never interleave.
    /// A write blocked on a slow peer is abandoned as soon as the peer is
    /// closed.
    pub async fn send_wire(&self, wire: &[u8]) -> Result<(), PeerError> {
        if self.is_closed() {
            return Err(PeerError::Closed);
        }

        let mut writer = self.inner.writer.lock().await;
        tokio::select! {
            biased;

            _ = self.inner.close_signal.cancelled() => Err(PeerError::Closed),

            result = async {
                writer.write_all(wire).await?;
                writer.flush().await
            } => result.map_err(PeerError::from),
        }
    }

    /// Closes the handle.
    ///
    /// Returns `true` for the call that actually closed it and `false` for
    /// every later call.
    pub async fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.inner.close_signal.cancel();

        // A sender may still hold the writer; it sees the signal and bails,
        // and the stream is released when the last handle drops. Buffered
        // bytes are discarded rather than flushed to a possibly stalled peer.
        if let Ok(mut writer) = self.inner.writer.try_lock() {
            if let Err(e) = writer.get_mut().shutdown().await {
                debug!(peer = %self.addr(), error = %e, "Shutdown of peer writer failed");
            }
        }

        true
    }

    /// True once the handle has been closed or its close signal fired.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire) || self.inner.close_signal.is_cancelled()
    }

    /// Resolves once the handle is closed.
    pub async fn closed(&self) {
        self.inner.close_signal.cancelled().await;
    }
}

impl PartialEq for PeerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for PeerHandle {}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("id", &self.id())
            .field("addr", self.addr())
            .field("closed", &self.is_closed())
            .finish()
    }
}
