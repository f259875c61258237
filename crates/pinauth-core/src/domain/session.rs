//! Session entity and connection identity.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pin::Pin;

/// Absolute lifetime of a session, measured from its `created_at`.
///
/// The clock is not sliding: activity on the connection does not extend it,
/// only an ownership transfer resets it.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Opaque identifier of one transport-level connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The live binding of a PIN to the connection currently allowed to use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub pin: Pin,
    pub connection_id: ConnectionId,
    /// Set at creation and refreshed on every transfer.
    pub created_at: Instant,
}

impl Session {
    pub fn new(pin: Pin, connection_id: ConnectionId, created_at: Instant) -> Self {
        Self {
            pin,
            connection_id,
            created_at,
        }
    }

    /// Returns `true` once `ttl` has fully elapsed since `created_at`.
    ///
    /// A session created at `t` is still valid at exactly `t + ttl - ε` and
    /// expired from `t + ttl` onwards.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}
