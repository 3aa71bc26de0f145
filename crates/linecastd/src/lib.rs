//! linecast daemon - peer registry and line broadcast server
//!
//! This crate provides the core infrastructure of the relay:
//! - `registry` - Peer registry actor, the single owner of connection state
//! - `broadcast` - Fan-out of one peer's line to every other peer
//! - `server` - TCP accept loop and per-connection workers
//! - `monitor` - Periodic online-peer reporting
//! - `config` - Listen address and tuning knobs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      linecastd                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   RelayServer   │────▶│       RegistryActor         │   │
//! │  │  (TcpListener)  │     │   (peer membership owner)   │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │ spawn                       │ snapshot/size    │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionWorker │────▶│  Broadcaster / Monitor      │   │
//! │  │  (per peer)     │     │                             │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod broadcast;
pub mod config;
pub mod monitor;
pub mod peer;
pub mod registry;
pub mod server;
