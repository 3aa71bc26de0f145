//! Registry actor commands, errors, and events.

use linecast_core::{PeerId, PeerInfo};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::peer::PeerHandle;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command carries a oneshot channel for its reply.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Add a peer. Re-registering a present peer is a no-op.
    ///
    /// Replies `true` if the peer was newly added.
    Register {
        peer: PeerHandle,
        respond_to: oneshot::Sender<bool>,
    },

    /// Remove a peer if present.
    ///
    /// Replies with the removed handle, or `None` if it was already gone.
    Unregister {
        peer_id: PeerId,
        reason: RemovalReason,
        respond_to: oneshot::Sender<Option<PeerHandle>>,
    },

    /// Current membership, optionally without one peer.
    Snapshot {
        exclude: Option<PeerId>,
        respond_to: oneshot::Sender<Vec<PeerHandle>>,
    },

    /// Current cardinality.
    Size { respond_to: oneshot::Sender<usize> },

    /// Whether a peer is registered.
    Contains {
        peer_id: PeerId,
        respond_to: oneshot::Sender<bool>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The actor is gone; no further commands can be served.
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Peer Events
// ============================================================================

/// Membership changes published by the registry.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    Registered { peer: PeerInfo },

    Removed {
        peer: PeerInfo,
        reason: RemovalReason,
    },
}

/// Why a peer left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The peer's read loop ended (EOF or read error).
    Disconnected,

    /// A broadcast write to the peer failed and it was pruned.
    WriteFailed,

    /// The server is shutting down.
    Shutdown,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::WriteFailed => write!(f, "pruned after failed write"),
            Self::Shutdown => write!(f, "server shutdown"),
        }
    }
}
