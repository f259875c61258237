//! # pinauth-core
//!
//! Session ownership rules for the PIN auth relay.
//!
//! A client proves nothing more than knowledge of a short numeric PIN, and the
//! relay guarantees that each PIN is held by at most one live connection.
//! This crate holds everything that decides *who owns a PIN*:
//!
//! - **`domain`** – the validated [`Pin`], [`ConnectionId`] and [`Session`]
//!   types plus the fixed one-hour [`SESSION_TTL`].
//! - **`registry`** – [`SessionRegistry`], which implements claim / release /
//!   lookup over an injected [`SessionStore`], and [`MemorySessionStore`],
//!   the in-process store used by the server.
//!
//! Transport concerns (WebSockets, eviction delivery, configuration) live in
//! the `pinauth-server` crate.

pub mod domain;
pub mod registry;

pub use domain::{ConnectionId, Pin, PinError, Session, SESSION_TTL};
pub use registry::{
    ClaimOutcome, MemorySessionStore, RegistryError, SessionRegistry, SessionStore, StoreError,
};
