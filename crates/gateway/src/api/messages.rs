//! HTTP message submission.
//!
//! Lets non-WebSocket callers push a message to a connected peer.  The
//! delivery outcome maps onto the status code: 200 delivered, 404 the
//! recipient has no active session, 504 the recipient's session exists
//! but its delivery queue would not accept the message in time.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use pl_relay::DeliveryOutcome;

use crate::state::AppState;

/// Label attached to messages submitted over HTTP without a sender name.
const API_SENDER: &str = "api";

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub recipient_uuid: String,
    pub message_text: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub recipient_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// POST /v1/messages
pub async fn submit(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> Response {
    let sender_label = req.sender_name.as_deref().unwrap_or(API_SENDER);

    let outcome = match state
        .router
        .send(API_SENDER, &req.recipient_uuid, &req.message_text, Some(sender_label))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let (code, status, reason) = match outcome {
        DeliveryOutcome::Delivered => (StatusCode::OK, "delivered", None),
        DeliveryOutcome::RecipientOffline => {
            (StatusCode::NOT_FOUND, "failed", Some("recipient_offline"))
        }
        DeliveryOutcome::RecipientUnreachable => (
            StatusCode::GATEWAY_TIMEOUT,
            "failed",
            Some("recipient_unreachable"),
        ),
    };

    (
        code,
        Json(SubmitResponse {
            status,
            recipient_uuid: req.recipient_uuid,
            reason,
        }),
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use pl_domain::config::Config;
    use pl_relay::{MessageRouter, OutboundMessage, PeerRegistry, PeerSession};
    use tokio::sync::mpsc;

    fn test_state() -> AppState {
        let registry = Arc::new(PeerRegistry::new());
        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            Duration::from_millis(50),
        ));
        AppState {
            config: Arc::new(Config::default()),
            registry,
            router,
        }
    }

    fn connect(state: &AppState, peer_id: &str) -> mpsc::Receiver<OutboundMessage> {
        let (tx, rx) = mpsc::channel(8);
        state
            .registry
            .register(Arc::new(PeerSession::new(peer_id.to_string(), tx)));
        rx
    }

    #[tokio::test]
    async fn delivered_returns_200() {
        let state = test_state();
        let mut rx = connect(&state, "alice");

        let resp = submit(
            State(state),
            Json(SubmitRequest {
                recipient_uuid: "alice".into(),
                message_text: "hello".into(),
                sender_name: None,
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.from, "api");
        assert_eq!(delivered.text, "hello");
    }

    #[tokio::test]
    async fn sender_name_overrides_display_label() {
        let state = test_state();
        let mut rx = connect(&state, "alice");

        let resp = submit(
            State(state),
            Json(SubmitRequest {
                recipient_uuid: "alice".into(),
                message_text: "hi".into(),
                sender_name: Some("ops-bot".into()),
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap().from, "ops-bot");
    }

    #[tokio::test]
    async fn offline_recipient_returns_404() {
        let state = test_state();

        let resp = submit(
            State(state),
            Json(SubmitRequest {
                recipient_uuid: "nobody".into(),
                message_text: "hello".into(),
                sender_name: None,
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stalled_recipient_returns_504() {
        let state = test_state();
        let (tx, _rx) = mpsc::channel(1);
        // Fill the single slot so the next push must wait out the timeout.
        tx.try_send(OutboundMessage {
            from: "x".into(),
            text: "y".into(),
        })
        .unwrap();
        state
            .registry
            .register(Arc::new(PeerSession::new("alice".to_string(), tx)));

        let resp = submit(
            State(state),
            Json(SubmitRequest {
                recipient_uuid: "alice".into(),
                message_text: "hello".into(),
                sender_name: None,
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn empty_message_returns_422() {
        let state = test_state();
        let _rx = connect(&state, "alice");

        let resp = submit(
            State(state),
            Json(SubmitRequest {
                recipient_uuid: "alice".into(),
                message_text: "   ".into(),
                sender_name: None,
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
