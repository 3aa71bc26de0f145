//! TCP server for the relay.
//!
//! The server:
//! - Binds the configured address (failure is a [`ServerError::Bind`])
//! - Starts the peer monitor exactly once
//! - Spawns a [`ConnectionWorker`] for each accepted connection
//! - Keeps accepting after transient accept errors
//! - Stops accepting when its cancellation token fires
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RelayServer   │──────────────┐ spawn once
//! │   Listener      │              ▼
//! └───────┬─────────┘     ┌─────────────────┐
//!         │ accept()      │   Peer monitor  │
//!         ▼               └─────────────────┘
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionWorker │────▶│  RegistryHandle │
//! │   (per peer)    │     │                 │
//! └─────────────────┘     └─────────────────┘
//! ```

mod connection;
mod listener;

pub use connection::ConnectionWorker;
pub use listener::Listener;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use linecast_core::{PeerAddr, PeerId, PeerInfo, PeerStats};

use crate::config::RelayConfig;
use crate::monitor::spawn_monitor_task;
use crate::peer::PeerHandle;
use crate::registry::RegistryHandle;

/// Line relay server.
pub struct RelayServer<L> {
    listener: L,

    /// Handle to the peer registry
    registry: RegistryHandle,

    config: RelayConfig,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating peer ids
    connection_counter: AtomicU64,

    /// Latest monitor sample
    stats: watch::Sender<PeerStats>,
}

impl RelayServer<TcpListener> {
    /// Binds the configured listen address.
    ///
    /// # Errors
    ///
    /// [`ServerError::Bind`] if the address is unavailable, malformed, or
    /// needs privileges the process lacks.
    pub async fn bind(
        config: RelayConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.listen_addr.clone(),
                error: e.to_string(),
            })?;

        Ok(Self::from_listener(listener, config, registry, cancel_token))
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }
}

impl<L: Listener> RelayServer<L> {
    /// Creates a server on an already-bound listener.
    pub fn from_listener(
        listener: L,
        config: RelayConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        let (stats, _) = watch::channel(PeerStats::default());
        Self {
            listener,
            registry,
            config,
            cancel_token,
            connection_counter: AtomicU64::new(1),
            stats,
        }
    }

    /// Receives every sample published by the peer monitor.
    pub fn subscribe_stats(&self) -> watch::Receiver<PeerStats> {
        self.stats.subscribe()
    }

    /// Runs the accept loop.
    ///
    /// Does not return until the cancellation token is triggered.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let monitor = spawn_monitor_task(
            self.registry.clone(),
            self.config.stats_interval,
            self.stats.clone(),
            self.cancel_token.clone(),
        );

        info!(listen = %self.config.listen_addr, "Relay server accepting connections");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.handle_connection(stream, addr),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        if let Err(e) = monitor.await {
            error!(error = %e, "Peer monitor task failed");
        }

        info!("Relay server stopped");
        Ok(())
    }

    /// Spawns a detached worker for a new connection.
    fn handle_connection(&self, stream: L::Stream, addr: PeerAddr) {
        let id = PeerId::new(self.connection_counter.fetch_add(1, Ordering::Relaxed));
        let (reader, writer) = tokio::io::split(stream);

        let peer = PeerHandle::new(
            PeerInfo::new(id, addr),
            writer,
            self.cancel_token.child_token(),
        );

        let worker = ConnectionWorker::new(
            peer,
            reader,
            self.registry.clone(),
            self.config.max_line_length,
            self.cancel_token.clone(),
        );

        tokio::spawn(worker.run());
    }
}

/// Binds `config.listen_addr` and serves until `cancel_token` fires.
pub async fn start(
    config: RelayConfig,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
) -> Result<(), ServerError> {
    RelayServer::bind(config, registry, cancel_token)
        .await?
        .run()
        .await
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("Failed to read local address: {0}")]
    LocalAddr(String),
}
