//! pinauth-server library crate.
//!
//! A WebSocket relay in which a client claims a numeric PIN and the server
//! guarantees that each PIN is bound to exactly one live connection.  When a
//! second connection claims a PIN, the first one is told it has been logged
//! out and the PIN moves to the newcomer.
//!
//! # Architecture
//!
//! ```text
//! Browser (JSON over WebSocket)
//!         ↕
//! [pinauth-server]
//!   ├── domain/           JSON event enums, ServerConfig
//!   ├── application/      EventRouter: claim / evict / release / ack
//!   └── infrastructure/
//!         ├── ws_server/       accept loop, handshake, reader/writer tasks
//!         ├── connection_hub/  live connections → outbound queues
//!         └── sweeper/         periodic purge of expired sessions
//!         ↕
//! [pinauth-core]  SessionRegistry over a SessionStore
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `pinauth-core`, and reaches the
//!   outside world only through the `EvictionNotifier` trait.
//! - `infrastructure` owns sockets and tasks.

/// Domain layer: event vocabulary and configuration (no I/O).
pub mod domain;

/// Application layer: routing client events against the registry.
pub mod application;

/// Infrastructure layer: WebSocket server, connection hub, sweeper.
pub mod infrastructure;
