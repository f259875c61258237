//! Connection event router.
//!
//! [`EventRouter`] turns client events into registry calls and responses.  It
//! knows nothing about sockets: the WebSocket layer hands it parsed
//! [`ClientEvent`]s and writes back whatever it returns, and evictions go out
//! through the injected [`EvictionNotifier`].
//!
//! # Contract
//!
//! - Every `enter-pin` gets exactly one `pin-status` response, even when the
//!   registry fails.
//! - An evicted connection is only *told*; it is not closed, and a notice to a
//!   connection that is already gone is silently dropped.
//! - Disconnect cleanup never propagates an error.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use pinauth_core::{ClaimOutcome, ConnectionId, Pin, PinError, RegistryError, SessionRegistry};

use crate::domain::messages::{ClientEvent, ServerEvent, PROCESSING_ERROR_MESSAGE};

/// Best-effort delivery of server-initiated events to a connection.
///
/// The infrastructure implementation pushes into the connection's outbound
/// queue; test implementations record calls.
#[async_trait]
pub trait EvictionNotifier: Send + Sync {
    /// Queues `event` for `target`.  Returns `false` when the target is
    /// unknown or already closed.  Never waits for the client.
    async fn notify(&self, target: ConnectionId, event: ServerEvent) -> bool;
}

/// Routes client events against the session registry.
#[derive(Clone)]
pub struct EventRouter {
    registry: SessionRegistry,
    notifier: Arc<dyn EvictionNotifier>,
}

impl EventRouter {
    pub fn new(registry: SessionRegistry, notifier: Arc<dyn EvictionNotifier>) -> Self {
        Self { registry, notifier }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handles one event from `connection_id` and returns the response to send
    /// back to it, if the event expects one.
    pub async fn handle_event(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Option<ServerEvent> {
        match event {
            ClientEvent::EnterPin {
                pin: Some(Value::String(raw)),
                id,
            } => Some(self.handle_enter_pin(connection_id, &raw, id).await),
            // Missing, null, numeric or structured PINs are still answered
            // with a pin-status so the client's request id is honoured.
            ClientEvent::EnterPin { id, .. } => {
                Some(reject_pin(connection_id, PinError::NotText, id))
            }
            ClientEvent::Ping { id } => id.map(|id| ServerEvent::Pong { id }),
        }
    }

    /// Validates `raw_pin`, claims it for `connection_id` and evicts the
    /// previous owner if there was one.
    pub async fn handle_enter_pin(
        &self,
        connection_id: ConnectionId,
        raw_pin: &str,
        id: Option<u64>,
    ) -> ServerEvent {
        let pin = match Pin::parse(raw_pin) {
            Ok(pin) => pin,
            Err(e) => return reject_pin(connection_id, e, id),
        };

        match self.registry.claim(&pin, connection_id).await {
            Ok(ClaimOutcome::Created) => ServerEvent::pin_success(pin.as_str(), id),

            // Re-entering a PIN you already hold just refreshes it.
            Ok(ClaimOutcome::Transferred { previous }) if previous == connection_id => {
                ServerEvent::pin_success(pin.as_str(), id)
            }

            Ok(ClaimOutcome::Transferred { previous }) => {
                let delivered = self
                    .notifier
                    .notify(previous, ServerEvent::force_logout(unix_millis()))
                    .await;
                if delivered {
                    info!(pin = %pin.masked(), evicted = %previous, "eviction notice sent");
                } else {
                    debug!(
                        pin = %pin.masked(),
                        evicted = %previous,
                        "previous owner no longer connected; eviction notice dropped"
                    );
                }
                ServerEvent::pin_overwritten(pin.as_str(), id)
            }

            Err(e) => {
                error!(
                    connection = %connection_id,
                    pin = %pin.masked(),
                    "claim failed: {e}"
                );
                ServerEvent::pin_error(PROCESSING_ERROR_MESSAGE, id)
            }
        }
    }

    /// Releases every session held by `connection_id`.  Failures are logged
    /// and swallowed.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        match self.registry.release_by_connection(connection_id).await {
            Ok(0) => debug!(connection = %connection_id, "no session to release"),
            Ok(_) => {}
            Err(e) => warn!(connection = %connection_id, "session cleanup failed: {e}"),
        }
    }
}

/// Builds the `pin-status` error for a PIN that failed validation.
fn reject_pin(connection_id: ConnectionId, reason: PinError, id: Option<u64>) -> ServerEvent {
    debug!(connection = %connection_id, "rejected PIN: {reason}");
    ServerEvent::pin_error(RegistryError::from(reason).to_string(), id)
}

/// Current Unix time in milliseconds, saturating at `u64::MAX`.
fn unix_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
