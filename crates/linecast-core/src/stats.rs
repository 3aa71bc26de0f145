//! Online-peer samples produced by the daemon's monitor task.

use chrono::{DateTime, Utc};

/// One sample of the registry's cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStats {
    /// Number of registered peers at the instant of sampling.
    pub online: usize,
    pub sampled_at: DateTime<Utc>,
}

impl PeerStats {
    pub fn new(online: usize) -> Self {
        Self {
            online,
            sampled_at: Utc::now(),
        }
    }
}

impl Default for PeerStats {
    fn default() -> Self {
        Self::new(0)
    }
}
