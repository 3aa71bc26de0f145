//! Periodic online-peer reporting.
//!
//! The monitor sleeps one interval, asks the registry for its size, logs
//! it and publishes it on a `watch` channel. Registry access happens only
//! at the sampling instant, never across the sleep.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use linecast_core::PeerStats;

use crate::registry::{RegistryError, RegistryHandle};

/// Takes one sample of the registry's cardinality.
pub async fn sample(registry: &RegistryHandle) -> Result<PeerStats, RegistryError> {
    registry.size().await.map(PeerStats::new)
}

/// Spawns the monitor task.
///
/// Runs until `cancel_token` fires or the registry goes away.
///
/// # Arguments
///
/// * `registry` - Registry to sample
/// * `period` - Time between samples; the first sample comes after one period
/// * `stats` - Receives every sample
/// * `cancel_token` - Token for graceful shutdown
pub fn spawn_monitor_task(
    registry: RegistryHandle,
    period: Duration,
    stats: watch::Sender<PeerStats>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(interval_ms = period.as_millis() as u64, "Peer monitor started");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    debug!("Peer monitor shutting down");
                    break;
                }

                _ = sleep(period) => {}
            }

            match sample(&registry).await {
                Ok(sample) => {
                    info!(online = sample.online, "Online peers");
                    stats.send_replace(sample);
                }
                Err(e) => {
                    warn!(error = %e, "Peer monitor stopping: registry unavailable");
                    break;
                }
            }
        }
    })
}
