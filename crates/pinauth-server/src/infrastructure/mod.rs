//! Infrastructure layer for pinauth-server.
//!
//! Everything that does I/O or owns tasks:
//!
//! - `ws_server` – TCP accept loop, WebSocket handshake, per-connection
//!   reader/writer tasks
//! - `connection_hub` – live connections and their outbound queues; the
//!   production [`EvictionNotifier`](crate::application::EvictionNotifier)
//! - `sweeper` – periodic purge of expired sessions

pub mod connection_hub;
pub mod sweeper;
pub mod ws_server;

pub use connection_hub::ConnectionHub;
pub use sweeper::spawn_expiry_sweeper;
pub use ws_server::{run_server, serve};
