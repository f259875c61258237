//! WebSocket server: accept loop and per-connection task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket, rejecting browsers
//!    whose `Origin` is not the configured front-end.
//! 3. Running one reader loop and one writer task per connection:
//!    - **Reader**: parses JSON frames into [`ClientEvent`]s and hands them to
//!      the [`EventRouter`] one at a time, queueing any response.
//!    - **Writer**: drains the connection's outbound queue (responses and
//!      eviction notices alike) into WebSocket text frames.
//! 4. Releasing the connection's sessions when it goes away, even if the
//!    connection task panicked.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! Events from one connection are handled strictly in order, so a close that
//! arrives while a claim is in flight is processed after the claim completes.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::{header::ORIGIN, HeaderValue, StatusCode},
        Error as WsError, Message as WsMessage,
    },
};
use tracing::{debug, error, info, warn};

use pinauth_core::{ConnectionId, SessionRegistry};

use crate::application::EventRouter;
use crate::domain::{ClientEvent, ServerConfig, ServerEvent};
use crate::infrastructure::connection_hub::{ConnectionHub, OutboundReceiver, OutboundSender};

/// How long `accept()` may block before the loop re-checks `running`.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves connections until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: ServerConfig,
    registry: SessionRegistry,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    serve(listener, config, registry, running).await
}

/// Runs the accept loop on an already-bound `listener`.
///
/// Each accepted connection gets its own task, so one slow client never
/// delays another.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    registry: SessionRegistry,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("PIN auth relay listening on {local_addr}");

    let hub = Arc::new(ConnectionHub::new());
    let router = EventRouter::new(registry, hub.clone());
    let allowed_origin: Arc<Option<String>> = Arc::new(config.allowed_origin);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let router = router.clone();
                let hub = Arc::clone(&hub);
                let allowed_origin = Arc::clone(&allowed_origin);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, router, hub, allowed_origin).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Outer wrapper for one connection: runs [`run_connection`] in its own task
/// and always performs disconnect cleanup afterwards, whether the connection
/// closed normally, failed, or panicked.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    router: EventRouter,
    hub: Arc<ConnectionHub>,
    allowed_origin: Arc<Option<String>>,
) {
    let connection_id = ConnectionId::new();

    let inner = tokio::spawn(run_connection(
        stream,
        peer_addr,
        connection_id,
        router.clone(),
        Arc::clone(&hub),
        allowed_origin,
    ));

    match inner.await {
        Ok(Ok(())) => info!(connection = %connection_id, "client {peer_addr} disconnected"),
        Ok(Err(e)) => warn!(connection = %connection_id, "client {peer_addr} closed with error: {e:#}"),
        Err(e) => error!(connection = %connection_id, "connection task for {peer_addr} failed: {e}"),
    }

    hub.unregister(connection_id).await;
    router.handle_disconnect(connection_id).await;
}

/// Runs the complete lifecycle of one WebSocket connection.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails (including an origin
/// rejection).
async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    connection_id: ConnectionId,
    router: EventRouter,
    hub: Arc<ConnectionHub>,
    allowed_origin: Arc<Option<String>>,
) -> anyhow::Result<()> {
    // ── Step 1: Complete the WebSocket handshake ─────────────────────────────
    // The callback sees the HTTP upgrade request before the 101 is sent, so a
    // disallowed browser origin is turned away with 403 and never registers.
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
        check_origin(request, response, allowed_origin.as_deref())
    })
    .await
    .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    info!(connection = %connection_id, "client connected from {peer_addr}");

    // ── Step 2: Register the outbound queue ──────────────────────────────────
    // From here on other connections can reach this one: an eviction notice
    // for a PIN we hold goes through the hub into this queue.  No registry
    // state is touched until the client submits a PIN.
    let (outbound_tx, outbound_rx) = hub.register(connection_id).await;

    // ── Step 3: Split streams and start the writer ───────────────────────────
    // The writer owns the sink half, so replies and eviction notices share a
    // single ordered path to the socket.
    let (ws_tx, mut ws_rx) = ws_stream.split();
    let writer = tokio::spawn(write_outbound(ws_tx, outbound_rx, connection_id));

    // ── Step 4: Reader loop ──────────────────────────────────────────────────
    // Frames are handled one at a time; the next frame is not read until the
    // router has answered the current one.
    while let Some(frame) = ws_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                debug!(connection = %connection_id, "WebSocket closed");
                break;
            }
            Err(e) => {
                warn!(connection = %connection_id, "WebSocket read error: {e}");
                break;
            }
        };

        match frame {
            WsMessage::Text(text) => {
                // A frame that is not a known event still gets an answer so
                // the client is never left waiting.
                let reply = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => router.handle_event(connection_id, event).await,
                    Err(e) => {
                        debug!(connection = %connection_id, "unparseable frame: {e}");
                        Some(ServerEvent::Error {
                            message: format!("invalid event: {e}"),
                        })
                    }
                };
                if let Some(reply) = reply {
                    queue(&outbound_tx, reply, connection_id);
                }
            }
            WsMessage::Binary(_) => {
                debug!(connection = %connection_id, "binary frame ignored");
            }
            WsMessage::Close(_) => {
                debug!(connection = %connection_id, "close frame received");
                break;
            }
            // Protocol-level ping/pong is answered by tungstenite itself.
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }

    // ── Step 5: Drain the writer ─────────────────────────────────────────────
    // Dropping both senders (ours and the hub's) closes the queue, so the
    // writer flushes what is left and sends a close frame.  A writer stuck on
    // a dead socket is aborted after a short grace period.
    drop(outbound_tx);
    hub.unregister(connection_id).await;
    let abort = writer.abort_handle();
    if timeout(Duration::from_secs(1), writer).await.is_err() {
        debug!(connection = %connection_id, "writer did not drain in time");
        abort.abort();
    }

    Ok(())
}

/// Drains `outbound` into the WebSocket until the queue closes or the socket
/// fails.
async fn write_outbound<S>(mut sink: S, mut outbound: OutboundReceiver, connection_id: ConnectionId)
where
    S: futures_util::Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(event) = outbound.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!(connection = %connection_id, "failed to serialize {}: {e}", event.name());
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::Text(json)).await {
            debug!(connection = %connection_id, "send of {} failed: {e}", event.name());
            break;
        }
    }
    let _ = sink.close().await;
}

fn queue(tx: &OutboundSender, event: ServerEvent, connection_id: ConnectionId) {
    if tx.send(event).is_err() {
        debug!(connection = %connection_id, "writer gone; response dropped");
    }
}

// ── Origin check ──────────────────────────────────────────────────────────────

/// Handshake callback: accepts the upgrade unless the request carries an
/// `Origin` that differs from `allowed`.
fn check_origin(
    request: &Request,
    response: Response,
    allowed: Option<&str>,
) -> Result<Response, ErrorResponse> {
    if origin_allowed(request.headers().get(ORIGIN), allowed) {
        return Ok(response);
    }
    warn!(
        origin = ?request.headers().get(ORIGIN),
        "rejected WebSocket upgrade from disallowed origin"
    );
    let mut forbidden = ErrorResponse::new(Some("origin not allowed".to_owned()));
    *forbidden.status_mut() = StatusCode::FORBIDDEN;
    Err(forbidden)
}

/// `true` when `origin` may connect given the configured `allowed` origin.
///
/// A missing header (non-browser client) or a missing/`*` configuration lets
/// everything through.  Comparison ignores ASCII case and a trailing slash.
fn origin_allowed(origin: Option<&HeaderValue>, allowed: Option<&str>) -> bool {
    let Some(allowed) = allowed.filter(|a| *a != "*") else {
        return true;
    };
    let Some(origin) = origin else {
        return true;
    };
    match origin.to_str() {
        Ok(origin) => origin
            .trim_end_matches('/')
            .eq_ignore_ascii_case(allowed.trim_end_matches('/')),
        Err(_) => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn header(v: &str) -> HeaderValue {
        HeaderValue::from_str(v).unwrap()
    }

    #[test]
    fn test_matching_origin_is_allowed() {
        assert!(origin_allowed(
            Some(&header("http://localhost:3000")),
            Some("http://localhost:3000")
        ));
    }

    #[test]
    fn test_origin_comparison_ignores_case_and_trailing_slash() {
        assert!(origin_allowed(
            Some(&header("HTTP://LOCALHOST:3000")),
            Some("http://localhost:3000/")
        ));
    }

    #[test]
    fn test_other_origin_is_rejected() {
        assert!(!origin_allowed(
            Some(&header("http://evil.example")),
            Some("http://localhost:3000")
        ));
    }

    #[test]
    fn test_missing_origin_header_is_allowed() {
        assert!(origin_allowed(None, Some("http://localhost:3000")));
    }

    #[test]
    fn test_wildcard_or_unset_allows_everything() {
        assert!(origin_allowed(Some(&header("http://evil.example")), Some("*")));
        assert!(origin_allowed(Some(&header("http://evil.example")), None));
    }

    #[test]
    fn test_check_origin_returns_403_on_mismatch() {
        let request = Request::builder()
            .uri("/")
            .header(ORIGIN, "http://evil.example")
            .body(())
            .unwrap();

        let result = check_origin(&request, Response::new(()), Some("http://localhost:3000"));

        let rejection = result.unwrap_err();
        assert_eq!(rejection.status(), StatusCode::FORBIDDEN);
    }
}
