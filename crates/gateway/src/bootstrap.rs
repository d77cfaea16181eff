//! AppState construction shared by the `serve` command and tests.

use std::sync::Arc;

use pl_domain::config::Config;
use pl_relay::{MessageRouter, PeerRegistry};

use crate::state::AppState;

/// Wire up the relay core and return a fully-built [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> AppState {
    let registry = Arc::new(PeerRegistry::new());
    let router = Arc::new(MessageRouter::new(
        registry.clone(),
        config.relay.delivery_timeout(),
    ));

    tracing::info!(
        delivery_timeout_secs = config.relay.delivery_timeout_secs,
        outbound_buffer = config.relay.outbound_buffer,
        "relay core ready"
    );

    AppState {
        config,
        registry,
        router,
    }
}
