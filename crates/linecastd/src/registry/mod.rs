//! Peer registry using the Actor pattern.
//!
//! The registry is the single owner of the set of connected peers. Every
//! access (register, unregister, snapshot, size) is a command on one mpsc
//! channel, so all of them are totally ordered without a shared lock.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │ ConnectionWorker │────▶│  RegistryActor  │────▶│ Broadcast Channel│
//! │ Broadcaster      │     └─────────────────┘     └──────────────────┘
//! │ Monitor          │             │                        │
//! └──────────────────┘             │                        │
//!    RegistryCommand          HashMap<PeerId,          PeerEvent
//!    (mpsc channel)            PeerHandle>           (observers)
//! ```
//!
//! Broadcast writes never run inside the actor: the broadcaster asks for a
//! snapshot and writes to peers on its own task.

use tokio::sync::{broadcast, mpsc};

mod actor;
mod commands;
mod handle;

pub use actor::RegistryActor;
pub use commands::{PeerEvent, RegistryCommand, RegistryError, RemovalReason};
pub use handle::RegistryHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 256;
const EVENT_BUFFER: usize = 256;

/// Spawn the registry actor and return a handle for interaction.
///
/// The actor runs until every handle has been dropped.
///
/// # Example
///
/// ```no_run
/// use linecastd::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry();
///     let online = handle.size().await;
/// }
/// ```
pub fn spawn_registry() -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = RegistryActor::new(cmd_rx, event_tx.clone());
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx, event_tx)
}
