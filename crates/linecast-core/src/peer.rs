//! Peer identity types.
//!
//! A peer is identified by a [`PeerId`] assigned when its connection is
//! accepted. Two connections from the same remote address are still two
//! distinct peers; identity never depends on the address label.

use std::fmt;

use chrono::{DateTime, Utc};

/// Process-unique identifier for an accepted connection.
///
/// Ids are handed out by the server from a monotonically increasing
/// counter and are never reused while the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl PeerId {
    /// Creates a peer id from a raw connection number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw connection number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

impl From<u64> for PeerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Remote-address label of a peer, immutable for the connection's lifetime.
///
/// Stored as a string so non-IP transports (in-memory pipes, Unix sockets)
/// can carry a meaningful label too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr(String);

impl PeerAddr {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<std::net::SocketAddr> for PeerAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<&str> for PeerAddr {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

/// Immutable description of a connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: PeerId,
    pub addr: PeerAddr,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

impl PeerInfo {
    /// Creates peer info stamped with the current time.
    pub fn new(id: PeerId, addr: impl Into<PeerAddr>) -> Self {
        Self {
            id,
            addr: addr.into(),
            connected_at: Utc::now(),
        }
    }

    /// Whole seconds elapsed since the connection was accepted.
    pub fn connected_secs(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.connected_at)
            .num_seconds()
            .max(0)
    }
}
