//! Storage seam for session records.
//!
//! The registry never touches a concrete table; it talks to a
//! [`SessionStore`] injected at construction.  Each method must be atomic on
//! its own: two concurrent calls on the same PIN observe each other's effects
//! in some serial order.  The registry builds its claim protocol on top of
//! that guarantee and needs nothing stronger.

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ConnectionId, Pin, Session};

/// Failures reported by a [`SessionStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// `insert_if_absent` found a live session for the PIN.
    #[error("a live session already exists for PIN {}", .0.masked())]
    DuplicateKey(Pin),

    /// The backing store could not serve the request (connection lost,
    /// timeout, internal fault).
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Create/find/update/delete operations over session records, keyed by PIN
/// with a secondary lookup by connection.
///
/// Expired records (older than the store's TTL at `now`) are treated as
/// absent by every method, whether or not they have been purged yet.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the live session for `pin`, if any.
    async fn find_by_pin(&self, pin: &Pin, now: Instant) -> Result<Option<Session>, StoreError>;

    /// Inserts `session` unless a live session already holds its PIN.
    ///
    /// Returns [`StoreError::DuplicateKey`] when the PIN is taken.  An expired
    /// record for the same PIN is replaced.
    async fn insert_if_absent(&self, session: Session) -> Result<(), StoreError>;

    /// Rebinds the live session for `pin` to `connection_id` and resets its
    /// `created_at` to `now`.
    ///
    /// Returns the connection that owned the session before the update, or
    /// `None` when no live session exists (nothing is written in that case).
    async fn update_owner(
        &self,
        pin: &Pin,
        connection_id: ConnectionId,
        now: Instant,
    ) -> Result<Option<ConnectionId>, StoreError>;

    /// Deletes every session bound to `connection_id` and returns how many
    /// were removed.
    async fn delete_by_connection(&self, connection_id: ConnectionId) -> Result<usize, StoreError>;

    /// Physically removes records that are expired at `now` and returns how
    /// many were removed.
    async fn purge_expired(&self, now: Instant) -> Result<usize, StoreError>;
}
