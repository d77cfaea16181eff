//! HTTP surface of the gateway.

pub mod messages;
pub mod peers;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::peers::ws::peer_ws;
use crate::state::AppState;

/// Build the versioned API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/peers", get(peers::list_peers))
        .route("/v1/peers/ws", get(peer_ws))
        .route("/v1/messages", post(messages::submit))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "protocol_version": pl_protocol::PROTOCOL_VERSION,
        "connected_peers": state.registry.len(),
    }))
}
