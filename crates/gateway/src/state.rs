use std::sync::Arc;

use pl_domain::config::Config;
use pl_relay::{MessageRouter, PeerRegistry};

/// Shared application state passed to all API handlers.
///
/// The registry and router are constructed once at process start and torn
/// down at shutdown; adapters receive them through this state rather than
/// through any ambient global.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<PeerRegistry>,
    pub router: Arc<MessageRouter>,
}
