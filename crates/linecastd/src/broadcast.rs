//! Fan-out of one peer's line to every other registered peer.
//!
//! # Consistency policy
//!
//! The broadcaster takes a snapshot of the membership from the registry and
//! writes to each peer *after* the snapshot has been taken, without holding
//! up the registry. A peer that disconnects mid-broadcast may or may not
//! receive the line. Writes within one broadcast are sequential, so a slow
//! peer delays delivery to peers later in the snapshot and delays the
//! sender's next read.

use linecast_core::PeerId;
use linecast_protocol::Line;
use tracing::{debug, warn};

use crate::peer::{PeerError, PeerHandle};
use crate::registry::{RegistryHandle, RemovalReason};

/// Outcome of one broadcast, for logging and tests.
///
/// The sending peer is never told about it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the line was written to.
    pub delivered: usize,

    /// Peers whose write failed and that were removed.
    pub pruned: usize,
}

#[derive(Clone)]
pub struct Broadcaster {
    registry: RegistryHandle,
}

impl Broadcaster {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Delivers `line` to every registered peer except `sender`.
    ///
    /// Best effort: a failed write closes and prunes that one peer and
    /// delivery continues with the rest. Never fails.
    pub async fn broadcast(&self, sender: PeerId, line: &Line) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let peers = match self.registry.snapshot_except(sender).await {
            Ok(peers) => peers,
            Err(e) => {
                warn!(sender = %sender, error = %e, "Broadcast skipped: registry unavailable");
                return report;
            }
        };

        let wire = line.to_wire();

        for peer in peers {
            match peer.send_wire(&wire).await {
                Ok(()) => report.delivered += 1,
                Err(PeerError::Closed) => {
                    // Its own worker or an earlier broadcast already closed it.
                    debug!(peer = %peer.addr(), "Skipping closed peer");
                }
                Err(e) => {
                    warn!(peer = %peer.addr(), peer_id = %peer.id(), error = %e, "Send failed, pruning peer");
                    self.prune(&peer).await;
                    report.pruned += 1;
                }
            }
        }

        report
    }

    /// Closes a peer and removes it from the registry.
    ///
    /// Safe to race with the peer's own worker doing the same.
    async fn prune(&self, peer: &PeerHandle) {
        peer.close().await;

        if let Err(e) = self
            .registry
            .unregister(peer.id(), RemovalReason::WriteFailed)
            .await
        {
            debug!(peer = %peer.addr(), error = %e, "Could not unregister pruned peer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::test_support::FailingWriter;
    use crate::registry::{spawn_registry, PeerEvent};
    use linecast_core::PeerInfo;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio_util::sync::CancellationToken;

    fn duplex_peer(id: u64) -> (PeerHandle, DuplexStream) {
        let (client, server) = tokio::io::duplex(1024);
        let peer = PeerHandle::new(
            PeerInfo::new(PeerId::new(id), format!("duplex-{id}").as_str()),
            server,
            CancellationToken::new(),
        );
        (peer, client)
    }

    fn broken_peer(id: u64) -> PeerHandle {
        PeerHandle::new(
            PeerInfo::new(PeerId::new(id), format!("broken-{id}").as_str()),
            FailingWriter,
            CancellationToken::new(),
        )
    }

    async fn read_exact_len(client: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        client.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let registry = spawn_registry();
        let (a, mut a_client) = duplex_peer(1);
        let (b, mut b_client) = duplex_peer(2);
        let (c, mut c_client) = duplex_peer(3);
        for peer in [&a, &b, &c] {
            registry.register(peer.clone()).await.unwrap();
        }

        let broadcaster = Broadcaster::new(registry.clone());
        let report = broadcaster.broadcast(a.id(), &Line::from("hello")).await;

        assert_eq!(report, BroadcastReport { delivered: 2, pruned: 0 });
        assert_eq!(read_exact_len(&mut b_client, 6).await, b"hello\n");
        assert_eq!(read_exact_len(&mut c_client, 6).await, b"hello\n");

        // Nothing was written back to the sender.
        drop(a);
        registry.unregister(PeerId::new(1), RemovalReason::Disconnected).await.unwrap();
        let mut rest = Vec::new();
        a_client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_failed_peer_is_pruned_and_others_still_receive() {
        let registry = spawn_registry();
        let mut events = registry.subscribe();

        let (sender, _sender_client) = duplex_peer(1);
        let broken = broken_peer(2);
        let mut healthy = Vec::new();
        registry.register(sender.clone()).await.unwrap();
        registry.register(broken.clone()).await.unwrap();
        for id in 3..=6 {
            let (peer, client) = duplex_peer(id);
            registry.register(peer).await.unwrap();
            healthy.push(client);
        }

        let broadcaster = Broadcaster::new(registry.clone());
        let report = broadcaster.broadcast(sender.id(), &Line::from("ping")).await;

        // HashMap order is arbitrary, so the broken peer lands anywhere in
        // the snapshot; every healthy peer must still get the line.
        assert_eq!(report, BroadcastReport { delivered: 4, pruned: 1 });
        for client in healthy.iter_mut() {
            assert_eq!(read_exact_len(client, 5).await, b"ping\n");
        }

        assert!(broken.is_closed());
        assert!(!registry.contains(broken.id()).await.unwrap());
        assert_eq!(registry.size().await.unwrap(), 5);

        let mut saw_prune = false;
        while let Ok(event) = events.try_recv() {
            if let PeerEvent::Removed { peer, reason } = event {
                assert_eq!(peer.id, broken.id());
                assert_eq!(reason, RemovalReason::WriteFailed);
                saw_prune = true;
            }
        }
        assert!(saw_prune);

        // A second broadcast no longer attempts the pruned peer.
        let report = broadcaster.broadcast(sender.id(), &Line::from("again")).await;
        assert_eq!(report, BroadcastReport { delivered: 4, pruned: 0 });
    }

    #[tokio::test]
    async fn test_broadcast_with_no_other_peers() {
        let registry = spawn_registry();
        let (only, _client) = duplex_peer(1);
        registry.register(only.clone()).await.unwrap();

        let report = Broadcaster::new(registry)
            .broadcast(only.id(), &Line::from("alone"))
            .await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_closed_peer_is_skipped_without_counting() {
        let registry = spawn_registry();
        let (closed, _client) = duplex_peer(2);
        registry.register(closed.clone()).await.unwrap();
        closed.close().await;

        let report = Broadcaster::new(registry)
            .broadcast(PeerId::new(1), &Line::from("x"))
            .await;
        assert_eq!(report, BroadcastReport::default());
    }
}
