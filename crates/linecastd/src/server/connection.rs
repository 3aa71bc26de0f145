//! Per-connection worker.
//!
//! Each accepted connection gets its own `ConnectionWorker` that:
//! - Registers the peer
//! - Reads newline-delimited lines until the stream ends or fails
//! - Broadcasts every line to the other peers
//! - Unregisters and closes the peer
//!
//! States: `Connecting → Registered → Reading → Closing → Closed`. Every
//! way out of `Reading` (EOF, read error, pruned by a failed broadcast
//! write, server shutdown) goes through the same cleanup.

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use linecast_protocol::LineReader;

use crate::broadcast::Broadcaster;
use crate::peer::PeerHandle;
use crate::registry::{RegistryHandle, RemovalReason};

pub struct ConnectionWorker<R> {
    /// Write side and identity of this connection
    peer: PeerHandle,

    /// Framed read side
    reader: LineReader<R>,

    registry: RegistryHandle,

    broadcaster: Broadcaster,

    /// Server-wide shutdown signal
    shutdown: CancellationToken,
}

impl<R> ConnectionWorker<R>
where
    R: AsyncRead + Send + Unpin,
{
    /// Creates a worker for an accepted connection.
    ///
    /// # Arguments
    ///
    /// * `peer` - Handle wrapping the connection's write half
    /// * `reader` - Read half of the connection
    /// * `registry` - Handle to the peer registry
    /// * `max_line_length` - Optional per-line byte limit
    /// * `shutdown` - Server shutdown token
    pub fn new(
        peer: PeerHandle,
        reader: R,
        registry: RegistryHandle,
        max_line_length: Option<usize>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            peer,
            reader: LineReader::new(reader).with_max_line_length(max_line_length),
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            shutdown,
        }
    }

    /// Runs the worker to completion.
    ///
    /// Returns why the read loop ended. Errors never escape the worker.
    pub async fn run(mut self) -> RemovalReason {
        if let Err(e) = self.registry.register(self.peer.clone()).await {
            warn!(peer = %self.peer.addr(), error = %e, "Registry unavailable, dropping connection");
            self.peer.close().await;
            return RemovalReason::Shutdown;
        }

        info!(peer = %self.peer.addr(), peer_id = %self.peer.id(), "Peer connected");

        let reason = self.read_loop().await;

        info!(
            peer = %self.peer.addr(),
            peer_id = %self.peer.id(),
            connected_secs = self.peer.info().connected_secs(),
            reason = %reason,
            "Peer disconnected"
        );

        // Unregister and close both tolerate having been done already.
        if let Err(e) = self.registry.unregister(self.peer.id(), reason).await {
            debug!(peer = %self.peer.addr(), error = %e, "Unregister failed");
        }
        self.peer.close().await;

        reason
    }

    async fn read_loop(&mut self) -> RemovalReason {
        loop {
            let result = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => return RemovalReason::Shutdown,

                // Closed by a broadcaster after a failed write.
                _ = self.peer.closed() => return RemovalReason::WriteFailed,

                result = self.reader.read_line() => result,
            };

            match result {
                Ok(Some(line)) => {
                    info!(peer = %self.peer.addr(), message = %line, "Message received");

                    let report = self.broadcaster.broadcast(self.peer.id(), &line).await;
                    debug!(
                        peer = %self.peer.addr(),
                        delivered = report.delivered,
                        pruned = report.pruned,
                        "Broadcast complete"
                    );
                }
                Ok(None) => {
                    debug!(peer = %self.peer.addr(), "Peer sent EOF");
                    return RemovalReason::Disconnected;
                }
                Err(e) if e.is_eof_like() => {
                    debug!(peer = %self.peer.addr(), error = %e, "Read ended");
                    return RemovalReason::Disconnected;
                }
                Err(e) => {
                    warn!(peer = %self.peer.addr(), error = %e, "Read error");
                    return RemovalReason::Disconnected;
                }
            }
        }
    }
}
