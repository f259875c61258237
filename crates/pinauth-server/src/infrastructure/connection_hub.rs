//! Registry of live WebSocket connections and their outbound queues.
//!
//! Each connection owns an unbounded mpsc queue drained by its writer task.
//! The hub maps [`ConnectionId`] to the sending half so that any task can push
//! an event to any connection without touching its socket.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use pinauth_core::ConnectionId;

use crate::application::EvictionNotifier;
use crate::domain::ServerEvent;

pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Live connections, keyed by id.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, OutboundSender>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the outbound queue for `connection_id`.
    ///
    /// Returns a sender for the connection's own replies and the receiver its
    /// writer task drains.  The queue closes once the connection is
    /// unregistered and the returned sender is dropped.
    pub async fn register(&self, connection_id: ConnectionId) -> (OutboundSender, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .insert(connection_id, tx.clone());
        (tx, rx)
    }

    /// Forgets `connection_id`.  Later sends to it report non-delivery.
    pub async fn unregister(&self, connection_id: ConnectionId) {
        self.connections.write().await.remove(&connection_id);
    }

    /// Queues `event` for `connection_id`; `false` if the connection is unknown
    /// or its writer has already stopped.
    pub async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&connection_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EvictionNotifier for ConnectionHub {
    async fn notify(&self, target: ConnectionId, event: ServerEvent) -> bool {
        self.send_to(target, event).await
    }
}
