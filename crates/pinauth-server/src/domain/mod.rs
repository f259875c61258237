//! Domain layer for pinauth-server.
//!
//! Pure types with no I/O: the JSON event vocabulary spoken over the
//! WebSocket and the server configuration struct.  Session ownership types
//! live in `pinauth-core`.

pub mod config;
pub mod messages;

pub use config::{Environment, ServerConfig};
pub use messages::{ClientEvent, PinStatus, ServerEvent, EVICTION_MESSAGE};
