//! Application layer for pinauth-server.
//!
//! Decides *what* happens for each client event (claim, evict, release,
//! acknowledge) and leaves *how* bytes move to the infrastructure layer.
//!
//! # What does NOT belong here?
//!
//! - Sockets, handshakes or task spawning (infrastructure)
//! - The session table itself (`pinauth-core`)

pub mod event_router;

pub use event_router::{EventRouter, EvictionNotifier};
