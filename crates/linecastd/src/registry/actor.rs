//! Registry actor - owns the peer set and processes commands.
//!
//! The actor runs in a single task and handles commands one at a time, so
//! membership changes are totally ordered and a snapshot never observes a
//! half-applied change.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use linecast_core::PeerId;

use super::commands::{PeerEvent, RegistryCommand, RemovalReason};
use crate::peer::PeerHandle;

/// The registry actor - owns all peer membership state.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Registered peers keyed by connection identity
    peers: HashMap<PeerId, PeerHandle>,

    /// Publisher for membership changes
    event_publisher: broadcast::Sender<PeerEvent>,
}

impl RegistryActor {
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        event_publisher: broadcast::Sender<PeerEvent>,
    ) -> Self {
        Self {
            receiver,
            peers: HashMap::new(),
            event_publisher,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    pub async fn run(mut self) {
        debug!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!(peers = self.peers.len(), "Registry actor stopped");
    }

    fn handle_command(&mut self, cmd: RegistryCommand) {
        // Reply send errors mean the caller stopped waiting; nothing to do.
        match cmd {
            RegistryCommand::Register { peer, respond_to } => {
                let _ = respond_to.send(self.handle_register(peer));
            }
            RegistryCommand::Unregister {
                peer_id,
                reason,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_unregister(peer_id, reason));
            }
            RegistryCommand::Snapshot {
                exclude,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_snapshot(exclude));
            }
            RegistryCommand::Size { respond_to } => {
                let _ = respond_to.send(self.peers.len());
            }
            RegistryCommand::Contains {
                peer_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.peers.contains_key(&peer_id));
            }
        }
    }

    fn handle_register(&mut self, peer: PeerHandle) -> bool {
        let peer_id = peer.id();
        if self.peers.contains_key(&peer_id) {
            debug!(peer_id = %peer_id, "Peer already registered");
            return false;
        }

        let info = peer.info().clone();
        self.peers.insert(peer_id, peer);

        debug!(
            peer_id = %peer_id,
            peer = %info.addr,
            online = self.peers.len(),
            "Peer registered"
        );

        let _ = self.event_publisher.send(PeerEvent::Registered { peer: info });
        true
    }

    fn handle_unregister(&mut self, peer_id: PeerId, reason: RemovalReason) -> Option<PeerHandle> {
        let Some(peer) = self.peers.remove(&peer_id) else {
            debug!(peer_id = %peer_id, reason = %reason, "Peer already unregistered");
            return None;
        };

        info!(
            peer_id = %peer_id,
            peer = %peer.addr(),
            reason = %reason,
            online = self.peers.len(),
            "Peer removed"
        );

        let _ = self.event_publisher.send(PeerEvent::Removed {
            peer: peer.info().clone(),
            reason,
        });

        Some(peer)
    }

    fn handle_snapshot(&self, exclude: Option<PeerId>) -> Vec<PeerHandle> {
        self.peers
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(_, peer)| peer.clone())
            .collect()
    }

    /// Returns the number of peers currently registered.
    #[cfg(test)]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}
