//! WebSocket endpoint for peer connections.
//!
//! Flow:
//! 1. Peer connects to `/v1/peers/ws`
//! 2. Peer sends `register` with its UUID (bounded by the register timeout)
//! 3. Relay responds with `registered` and installs the session
//! 4. Bidirectional loop: peer sends `send`, relay answers `sent` /
//!    `send_failed` / `error` and pushes `deliver` frames for inbound
//!    messages; `ping`/`pong` keep the connection warm
//!
//! Teardown is owned here: on disconnect or eviction the session is
//! deregistered (compare-and-remove, so a stale teardown never disturbs a
//! newer registration) and moved to `Closed`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use pl_protocol::{DeliveryFailure, WsMessage};
use pl_relay::{DeliveryOutcome, OutboundMessage, PeerSession};

use crate::state::AppState;

/// GET /v1/peers/ws — upgrade to WebSocket.
pub async fn peer_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Socket handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // 1. Wait for the register frame.
    let peer_id = match wait_for_register(&mut ws_stream, state.config.relay.register_timeout())
        .await
    {
        Ok(uuid) => uuid,
        Err(reason) => {
            tracing::warn!(reason = %reason, "peer dropped before registering");
            let _ = send_ws_message(&mut ws_sink, &WsMessage::Error { message: reason }).await;
            return;
        }
    };

    // 2. Build the session: a bounded channel for deliveries plus a small
    //    control channel for acks, errors and pongs.
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<OutboundMessage>(state.config.relay.outbound_buffer);
    let (ctrl_tx, mut ctrl_rx) = mpsc::channel::<WsMessage>(16);

    let session = Arc::new(PeerSession::new(peer_id.clone(), outbound_tx));
    let session_id = session.session_id().to_string();
    let closing = session.closing();

    // 3. Ack the registration before the session becomes a delivery
    //    target, so the peer never sees a deliver before its registered.
    let ack = WsMessage::Registered {
        uuid: peer_id.clone(),
        session_id: session_id.clone(),
    };
    if send_ws_message(&mut ws_sink, &ack).await.is_err() {
        tracing::warn!(peer_id = %peer_id, "failed to send registered ack");
        return;
    }

    // 4. Install in the registry; any previous connection under this UUID
    //    is evicted and its handler sees the cancellation below.
    state.registry.register(session.clone());

    // Writer task: merge deliveries and control frames into the socket.
    let writer = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(out) = outbound_rx.recv() => WsMessage::Deliver {
                    from: out.from,
                    text: out.text,
                },
                Some(ctrl) = ctrl_rx.recv() => ctrl,
                else => break,
            };
            if send_ws_message(&mut ws_sink, &msg).await.is_err() {
                break;
            }
        }
    });

    // 5. Reader loop: ends on disconnect or on eviction.
    loop {
        tokio::select! {
            _ = closing.cancelled() => {
                tracing::info!(
                    peer_id = %peer_id,
                    session_id = %session_id,
                    "session evicted by a newer registration"
                );
                break;
            }
            frame = ws_stream.next() => {
                let Some(Ok(msg)) = frame else { break };
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<WsMessage>(&text) {
                            Ok(inbound) => {
                                handle_inbound(&state, &peer_id, inbound, &ctrl_tx).await
                            }
                            Err(e) => {
                                tracing::debug!(
                                    peer_id = %peer_id,
                                    error = %e,
                                    "ignoring unparseable frame"
                                );
                            }
                        }
                    }
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => {
                        // axum answers WS-level pings itself.
                        state.registry.touch(&peer_id);
                    }
                    _ => {}
                }
            }
        }
    }

    // 6. Teardown.  Compare-and-remove: if this session was evicted, the
    //    replacement's entry stays untouched.
    state.registry.deregister(&peer_id, &session_id);
    writer.abort();
    session.finish_close();
    tracing::info!(peer_id = %peer_id, session_id = %session_id, "peer disconnected");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound frames
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_inbound(
    state: &AppState,
    peer_id: &str,
    msg: WsMessage,
    ctrl: &mpsc::Sender<WsMessage>,
) {
    state.registry.touch(peer_id);

    match msg {
        WsMessage::Send { to_uuid, text } => {
            let reply = match state
                .router
                .send(peer_id, &to_uuid, &text, Some(peer_id))
                .await
            {
                Ok(DeliveryOutcome::Delivered) => WsMessage::Sent { to_uuid },
                Ok(DeliveryOutcome::RecipientOffline) => WsMessage::SendFailed {
                    to_uuid,
                    reason: DeliveryFailure::Offline,
                },
                Ok(DeliveryOutcome::RecipientUnreachable) => WsMessage::SendFailed {
                    to_uuid,
                    reason: DeliveryFailure::Unreachable,
                },
                Err(e) => WsMessage::Error {
                    message: e.to_string(),
                },
            };
            let _ = ctrl.send(reply).await;
        }
        WsMessage::Ping { timestamp } => {
            let _ = ctrl.send(WsMessage::Pong { timestamp }).await;
        }
        WsMessage::Pong { .. } => {
            // Heartbeat acknowledgment — touch already done above.
        }
        other => {
            tracing::debug!(
                peer_id = %peer_id,
                frame = ?std::mem::discriminant(&other),
                "unexpected inbound frame type"
            );
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Consume frames until a valid `register` arrives.  The UUID is
/// validated here, at the boundary — the registry itself stays
/// format-agnostic.
async fn wait_for_register(
    stream: &mut SplitStream<WebSocket>,
    timeout: Duration,
) -> Result<String, String> {
    let registered = tokio::time::timeout(timeout, async {
        while let Some(Ok(msg)) = stream.next().await {
            let Message::Text(text) = msg else { continue };
            match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::Register { uuid }) => {
                    if uuid::Uuid::parse_str(uuid.trim()).is_err() {
                        return Err(format!("invalid uuid: {uuid}"));
                    }
                    return Ok(uuid.trim().to_string());
                }
                Ok(_) => return Err("register with your uuid first".into()),
                Err(_) => continue,
            }
        }
        Err("connection closed before register".into())
    })
    .await;

    match registered {
        Ok(result) => result,
        Err(_) => Err("registration timed out".into()),
    }
}

async fn send_ws_message(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &WsMessage,
) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}
