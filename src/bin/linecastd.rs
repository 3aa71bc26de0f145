//! linecast daemon - line broadcast relay
//!
//! Accepts TCP connections and forwards every newline-terminated line a
//! peer sends to all other connected peers.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:6380)
//! linecastd
//!
//! # Custom address and a 5 second online-count report
//! linecastd --listen 127.0.0.1:9000 --stats-interval-ms 5000
//!
//! # Same, from the environment
//! LINECAST_LISTEN=127.0.0.1:9000 LINECAST_STATS_INTERVAL_MS=5000 linecastd
//!
//! # Enable debug logging
//! RUST_LOG=linecastd=debug linecastd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use linecastd::config::{parse_max_line, ConfigError, RelayConfig};
use linecastd::registry::spawn_registry;
use linecastd::server::RelayServer;

/// linecast daemon - broadcasts each line to every other connected peer
#[derive(Parser, Debug)]
#[command(name = "linecastd", version, about)]
struct Args {
    /// Address to listen on (overrides LINECAST_LISTEN)
    #[arg(short, long)]
    listen: Option<String>,

    /// Online-count report interval in milliseconds (overrides LINECAST_STATS_INTERVAL_MS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    stats_interval_ms: Option<u64>,

    /// Maximum line length in bytes (overrides LINECAST_MAX_LINE)
    #[arg(long, value_parser = parse_max_line_arg)]
    max_line: Option<usize>,
}

impl Args {
    /// Applies command-line overrides on top of `config`.
    fn apply(self, mut config: RelayConfig) -> RelayConfig {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(ms) = self.stats_interval_ms {
            config.stats_interval = Duration::from_millis(ms);
        }
        if let Some(max) = self.max_line {
            config.max_line_length = Some(max);
        }
        config
    }
}

fn parse_max_line_arg(raw: &str) -> Result<usize, ConfigError> {
    parse_max_line("--max-line", raw)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("linecastd=info".parse()?)
                .add_directive("linecast_core=info".parse()?)
                .add_directive("linecast_protocol=info".parse()?),
        )
        .init();

    let config = args.apply(RelayConfig::from_env().context("Invalid LINECAST_* environment")?);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        listen = %config.listen_addr,
        "linecast daemon starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Setup signal handlers
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry();
    info!("Peer registry started");

    let listen_addr = config.listen_addr.clone();
    let server = RelayServer::bind(config, registry, cancel_token)
        .await
        .with_context(|| format!("Failed to start relay on {listen_addr}"))?;

    if let Ok(addr) = server.local_addr() {
        info!(addr = %addr, "Listening");
    }

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("linecast daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
