//! In-process [`SessionStore`] backed by two hash maps under one lock.
//!
//! `by_pin` is the primary table and enforces PIN uniqueness.  `by_connection`
//! is a secondary index so a disconnect does not have to scan every session.
//! Both maps are updated inside the same write guard, so they never disagree
//! from the point of view of another caller.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{SessionStore, StoreError};
use crate::domain::{ConnectionId, Pin, Session, SESSION_TTL};

#[derive(Debug, Default)]
struct Tables {
    by_pin: HashMap<Pin, Session>,
    by_connection: HashMap<ConnectionId, HashSet<Pin>>,
}

impl Tables {
    fn index(&mut self, connection_id: ConnectionId, pin: Pin) {
        self.by_connection.entry(connection_id).or_default().insert(pin);
    }

    fn unindex(&mut self, connection_id: ConnectionId, pin: &Pin) {
        if let Some(pins) = self.by_connection.get_mut(&connection_id) {
            pins.remove(pin);
            if pins.is_empty() {
                self.by_connection.remove(&connection_id);
            }
        }
    }

    fn remove(&mut self, pin: &Pin) -> Option<Session> {
        let session = self.by_pin.remove(pin)?;
        self.unindex(session.connection_id, pin);
        Some(session)
    }
}

/// Session store that lives in process memory.
#[derive(Debug)]
pub struct MemorySessionStore {
    tables: RwLock<Tables>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Creates an empty store using the standard one-hour [`SESSION_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    /// Creates an empty store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            ttl,
        }
    }

    /// Number of records currently held, including expired ones that have
    /// not been purged.
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_pin.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_by_pin(&self, pin: &Pin, now: Instant) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_pin
            .get(pin)
            .filter(|s| !s.is_expired(now, self.ttl))
            .cloned())
    }

    async fn insert_if_absent(&self, session: Session) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let live = tables
            .by_pin
            .get(&session.pin)
            .map(|existing| !existing.is_expired(session.created_at, self.ttl));
        match live {
            Some(true) => return Err(StoreError::DuplicateKey(session.pin)),
            Some(false) => {
                tables.remove(&session.pin);
            }
            None => {}
        }

        tables.index(session.connection_id, session.pin.clone());
        tables.by_pin.insert(session.pin.clone(), session);
        Ok(())
    }

    async fn update_owner(
        &self,
        pin: &Pin,
        connection_id: ConnectionId,
        now: Instant,
    ) -> Result<Option<ConnectionId>, StoreError> {
        let mut tables = self.tables.write().await;

        let current = tables
            .by_pin
            .get(pin)
            .map(|s| (s.connection_id, s.is_expired(now, self.ttl)));
        let previous = match current {
            None => return Ok(None),
            Some((_, true)) => {
                tables.remove(pin);
                return Ok(None);
            }
            Some((owner, false)) => owner,
        };

        tables.unindex(previous, pin);
        tables.index(connection_id, pin.clone());
        if let Some(session) = tables.by_pin.get_mut(pin) {
            session.connection_id = connection_id;
            session.created_at = now;
        }
        Ok(Some(previous))
    }

    async fn delete_by_connection(&self, connection_id: ConnectionId) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(pins) = tables.by_connection.remove(&connection_id) else {
            return Ok(0);
        };
        let removed = pins
            .iter()
            .filter(|pin| tables.by_pin.remove(*pin).is_some())
            .count();
        Ok(removed)
    }

    async fn purge_expired(&self, now: Instant) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let expired: Vec<Pin> = tables
            .by_pin
            .values()
            .filter(|s| s.is_expired(now, self.ttl))
            .map(|s| s.pin.clone())
            .collect();
        for pin in &expired {
            tables.remove(pin);
        }
        Ok(expired.len())
    }
}
