//! linecast core - shared peer types
//!
//! This crate provides the identity and reporting types shared between
//! the relay daemon (`linecastd`) and its wire protocol crate.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod peer;
pub mod stats;

pub use peer::{PeerAddr, PeerId, PeerInfo};
pub use stats::PeerStats;
