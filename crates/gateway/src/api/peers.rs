//! Read-only view over the connection registry.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use pl_relay::PeerInfo;

use crate::state::AppState;

#[derive(Serialize)]
pub struct PeerListResponse {
    pub peers: Vec<PeerInfo>,
    pub count: usize,
}

/// GET /v1/peers — list currently connected peers.
pub async fn list_peers(State(state): State<AppState>) -> Json<PeerListResponse> {
    let peers = state.registry.list();
    let count = peers.len();
    Json(PeerListResponse { peers, count })
}
