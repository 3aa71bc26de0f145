//! Client interface for interacting with the RegistryActor.
//!
//! Channel errors are mapped to `RegistryError::ChannelClosed`.

use tokio::sync::{broadcast, mpsc, oneshot};

use linecast_core::PeerId;

use super::commands::{PeerEvent, RegistryCommand, RegistryError, RemovalReason};
use crate::peer::PeerHandle;

/// Cheap-to-clone handle to the registry actor.
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,

    /// Event broadcaster for subscribing to membership changes
    event_sender: broadcast::Sender<PeerEvent>,
}

impl RegistryHandle {
    pub fn new(
        sender: mpsc::Sender<RegistryCommand>,
        event_sender: broadcast::Sender<PeerEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Adds a peer. Returns `false` if it was already registered.
    pub async fn register(&self, peer: PeerHandle) -> Result<bool, RegistryError> {
        self.request(|respond_to| RegistryCommand::Register { peer, respond_to })
            .await
    }

    /// Removes a peer if present.
    ///
    /// Removing an absent peer is not an error; the result is `None`.
    pub async fn unregister(
        &self,
        peer_id: PeerId,
        reason: RemovalReason,
    ) -> Result<Option<PeerHandle>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Unregister {
            peer_id,
            reason,
            respond_to,
        })
        .await
    }

    /// All registered peers.
    pub async fn snapshot(&self) -> Result<Vec<PeerHandle>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Snapshot {
            exclude: None,
            respond_to,
        })
        .await
    }

    /// All registered peers except `sender`.
    pub async fn snapshot_except(&self, sender: PeerId) -> Result<Vec<PeerHandle>, RegistryError> {
        self.request(|respond_to| RegistryCommand::Snapshot {
            exclude: Some(sender),
            respond_to,
        })
        .await
    }

    /// Number of registered peers.
    pub async fn size(&self) -> Result<usize, RegistryError> {
        self.request(|respond_to| RegistryCommand::Size { respond_to })
            .await
    }

    pub async fn contains(&self, peer_id: PeerId) -> Result<bool, RegistryError> {
        self.request(|respond_to| RegistryCommand::Contains {
            peer_id,
            respond_to,
        })
        .await
    }

    /// Subscribe to membership events.
    ///
    /// This is a synchronous operation - it doesn't communicate with the actor.
    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.event_sender.subscribe()
    }

    /// Returns `true` while the actor's command channel is open.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn request<T, F>(&self, build: F) -> Result<T, RegistryError>
    where
        F: FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(build(tx))
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }
}
