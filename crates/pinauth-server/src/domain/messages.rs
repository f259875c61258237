//! JSON event types for the client-facing WebSocket protocol.
//!
//! Every frame is a JSON object whose `"event"` field names the variant; the
//! remaining fields are flattened into the same object:
//!
//! ```json
//! {"event":"enter-pin","pin":"4242","id":1}
//! {"event":"pin-status","status":"overwritten","pin":"4242","id":1}
//! {"event":"force-logout","message":"Logged in from another device","timestamp":1760745600000}
//! ```
//!
//! Serde's `#[serde(tag = "event")]` handles the discriminant.  Client and
//! server directions are separate enums so that a server-only event cannot be
//! parsed from a client frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message pushed to a connection that lost its PIN to another connection.
pub const EVICTION_MESSAGE: &str = "Logged in from another device";

/// Generic message returned when a claim fails for reasons the client cannot
/// act on (store down, repeated races).
pub const PROCESSING_ERROR_MESSAGE: &str = "Error processing PIN";

// ── Client → Server ───────────────────────────────────────────────────────────

/// Events a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Claim a PIN for this connection.  Always answered with `pin-status`.
    EnterPin {
        /// Raw PIN as sent, of whatever JSON type.  Kept loose so that a
        /// missing, null or numeric PIN still reaches the router and gets a
        /// correlated `pin-status` error instead of a frame-level `error`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pin: Option<Value>,
        /// Optional correlation id echoed back in the response.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },

    /// Liveness probe.  Answered with `pong` only when `id` is present.
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
}

// ── Server → Client ───────────────────────────────────────────────────────────

/// Result of an `enter-pin` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinStatus {
    /// The PIN was free and now belongs to the caller.
    Success,
    /// The PIN belonged to another connection, which has been evicted.
    Overwritten,
    /// The request was rejected or could not be processed.
    Error,
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Response to `enter-pin`.
    PinStatus {
        status: PinStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pin: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },

    /// Advisory eviction notice; fire-and-forget.
    ForceLogout {
        message: String,
        /// Unix time in milliseconds when the takeover happened.
        timestamp: u64,
    },

    /// Acknowledgement of a `ping` that carried an id.
    Pong { id: u64 },

    /// A frame could not be understood.  The connection stays open.
    Error { message: String },
}

impl ServerEvent {
    pub fn pin_success(pin: impl Into<String>, id: Option<u64>) -> Self {
        Self::PinStatus {
            status: PinStatus::Success,
            pin: Some(pin.into()),
            message: None,
            id,
        }
    }

    pub fn pin_overwritten(pin: impl Into<String>, id: Option<u64>) -> Self {
        Self::PinStatus {
            status: PinStatus::Overwritten,
            pin: Some(pin.into()),
            message: None,
            id,
        }
    }

    pub fn pin_error(message: impl Into<String>, id: Option<u64>) -> Self {
        Self::PinStatus {
            status: PinStatus::Error,
            pin: None,
            message: Some(message.into()),
            id,
        }
    }

    /// Eviction notice stamped with `timestamp` (Unix milliseconds).
    pub fn force_logout(timestamp: u64) -> Self {
        Self::ForceLogout {
            message: EVICTION_MESSAGE.to_owned(),
            timestamp,
        }
    }

    /// Short name for log lines; never includes field values.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PinStatus { .. } => "pin-status",
            Self::ForceLogout { .. } => "force-logout",
            Self::Pong { .. } => "pong",
            Self::Error { .. } => "error",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_enter_pin_deserializes_with_and_without_id() {
        let with_id: ClientEvent =
            serde_json::from_str(r#"{"event":"enter-pin","pin":"4242","id":7}"#).unwrap();
        assert_eq!(
            with_id,
            ClientEvent::EnterPin {
                pin: Some("4242".into()),
                id: Some(7)
            }
        );

        let without: ClientEvent =
            serde_json::from_str(r#"{"event":"enter-pin","pin":"4242"}"#).unwrap();
        assert_eq!(
            without,
            ClientEvent::EnterPin {
                pin: Some("4242".into()),
                id: None
            }
        );
    }

    #[test]
    fn test_bare_ping_deserializes() {
        let ping: ClientEvent = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(ping, ClientEvent::Ping { id: None });
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<ClientEvent, _> = serde_json::from_str(r#"{"event":"force-logout"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_enter_pin_with_non_string_pin_still_parses() {
        // The router rejects these; the frame itself must not fail to parse,
        // or the request id would be lost.
        let numeric: ClientEvent =
            serde_json::from_str(r#"{"event":"enter-pin","pin":4242,"id":9}"#).unwrap();
        assert_eq!(
            numeric,
            ClientEvent::EnterPin {
                pin: Some(json!(4242)),
                id: Some(9)
            }
        );

        let null: ClientEvent =
            serde_json::from_str(r#"{"event":"enter-pin","pin":null,"id":9}"#).unwrap();
        assert_eq!(null, ClientEvent::EnterPin { pin: None, id: Some(9) });

        let missing: ClientEvent =
            serde_json::from_str(r#"{"event":"enter-pin","id":9}"#).unwrap();
        assert_eq!(missing, ClientEvent::EnterPin { pin: None, id: Some(9) });
    }

    #[test]
    fn test_pin_success_wire_shape() {
        let v: Value = serde_json::to_value(ServerEvent::pin_success("4242", None)).unwrap();
        assert_eq!(
            v,
            json!({"event":"pin-status","status":"success","pin":"4242"})
        );
    }

    #[test]
    fn test_pin_overwritten_echoes_id() {
        let v: Value = serde_json::to_value(ServerEvent::pin_overwritten("4242", Some(3))).unwrap();
        assert_eq!(
            v,
            json!({"event":"pin-status","status":"overwritten","pin":"4242","id":3})
        );
    }

    #[test]
    fn test_pin_error_wire_shape() {
        let v: Value = serde_json::to_value(ServerEvent::pin_error("bad", None)).unwrap();
        assert_eq!(v, json!({"event":"pin-status","status":"error","message":"bad"}));
    }

    #[test]
    fn test_force_logout_wire_shape() {
        let v: Value = serde_json::to_value(ServerEvent::force_logout(1_700_000_000_000)).unwrap();
        assert_eq!(
            v,
            json!({
                "event":"force-logout",
                "message":"Logged in from another device",
                "timestamp":1_700_000_000_000u64
            })
        );
    }

    #[test]
    fn test_pong_wire_shape() {
        let v: Value = serde_json::to_value(ServerEvent::Pong { id: 9 }).unwrap();
        assert_eq!(v, json!({"event":"pong","id":9}));
    }

    #[test]
    fn test_event_name_does_not_leak_fields() {
        let name = ServerEvent::pin_success("987654", None).name();
        assert_eq!(name, "pin-status");
        assert!(!name.contains("987654"));
    }
}
