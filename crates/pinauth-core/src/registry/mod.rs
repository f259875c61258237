//! Session registry: the single source of truth for PIN ownership.
//!
//! [`SessionRegistry`] layers the ownership protocol over an injected
//! [`SessionStore`]:
//!
//! ```text
//! claim(pin, conn)
//!   ├─ update_owner(pin, conn)   ── Some(prev) ──▶ Transferred { previous: prev }
//!   │        │ None
//!   └─ insert_if_absent(session) ── Ok ─────────▶ Created
//!            │ DuplicateKey (lost a creation race)
//!            └─ retry from the top, at most MAX_CLAIM_ATTEMPTS times
//! ```
//!
//! Both store calls are individually atomic, so concurrent claims on one PIN
//! are linearised by the store: exactly one of them can create the record and
//! every other one becomes a transfer.  A loser of the creation race is never
//! reported to the caller as a duplicate.

pub mod memory;
pub mod store;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

pub use memory::MemorySessionStore;
pub use store::{SessionStore, StoreError};

use crate::domain::{ConnectionId, Pin, PinError, Session};

/// How many times `claim` runs the update/insert cycle before giving up.
///
/// Each retry only happens after another claimant created the record in
/// between our two store calls, so more than one retry requires the record to
/// be deleted again in that window as well.
pub const MAX_CLAIM_ATTEMPTS: u32 = 3;

/// Result of a successful [`SessionRegistry::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No live session existed; one was created for the claimant.
    Created,
    /// A live session existed and now belongs to the claimant.
    Transferred {
        /// The connection that owned the PIN until this claim.
        previous: ConnectionId,
    },
}

/// Errors surfaced by the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The submitted PIN failed validation; nothing was written.
    #[error("invalid PIN: {0}")]
    InvalidPin(#[from] PinError),

    /// The store failed, or a claim kept losing creation races past its
    /// retry budget.
    #[error("unexpected registry failure: {0}")]
    Unexpected(#[from] StoreError),
}

/// Authoritative PIN → connection mapping.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
}

impl SessionRegistry {
    /// Wraps `store` as the registry's backing table.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Convenience constructor for an in-memory registry with the standard TTL.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Looks up the live session for `pin`.  Expired sessions are never
    /// returned, even if the sweeper has not removed them yet.
    pub async fn find_by_pin(&self, pin: &Pin) -> Result<Option<Session>, RegistryError> {
        Ok(self.store.find_by_pin(pin, now()).await?)
    }

    /// Binds `pin` to `connection_id`, creating or transferring the session.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unexpected`] when the store fails, or when
    /// every attempt lost a creation race.
    pub async fn claim(
        &self,
        pin: &Pin,
        connection_id: ConnectionId,
    ) -> Result<ClaimOutcome, RegistryError> {
        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            let now = now();

            if let Some(previous) = self.store.update_owner(pin, connection_id, now).await? {
                info!(
                    pin = %pin.masked(),
                    %previous,
                    owner = %connection_id,
                    "session transferred"
                );
                return Ok(ClaimOutcome::Transferred { previous });
            }

            match self
                .store
                .insert_if_absent(Session::new(pin.clone(), connection_id, now))
                .await
            {
                Ok(()) => {
                    info!(pin = %pin.masked(), owner = %connection_id, "session created");
                    return Ok(ClaimOutcome::Created);
                }
                Err(StoreError::DuplicateKey(_)) => {
                    debug!(
                        pin = %pin.masked(),
                        attempt,
                        "lost creation race; retrying as transfer"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RegistryError::Unexpected(StoreError::DuplicateKey(pin.clone())))
    }

    /// Deletes whatever sessions `connection_id` holds.  Idempotent.
    ///
    /// Returns the number of sessions removed (zero when none were bound).
    pub async fn release_by_connection(
        &self,
        connection_id: ConnectionId,
    ) -> Result<usize, RegistryError> {
        let removed = self.store.delete_by_connection(connection_id).await?;
        if removed > 0 {
            info!(connection = %connection_id, removed, "sessions released");
        }
        Ok(removed)
    }

    /// Physically removes expired sessions and returns how many went.
    ///
    /// Lookups already hide expired sessions; this only reclaims memory.
    pub async fn purge_expired(&self) -> Result<usize, RegistryError> {
        let purged = self.store.purge_expired(now()).await?;
        if purged > 0 {
            debug!(purged, "expired sessions purged");
        }
        Ok(purged)
    }
}

/// Current time from tokio's clock, so paused-time tests drive expiry.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
