//! In-memory registry of connected peers.
//!
//! The registry is the only shared mutable structure in the core.  All
//! mutations and lookups are serialized through one `RwLock`; no registry
//! operation performs I/O or blocks on anything but that lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::session::PeerSession;

/// Summary info returned by list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PeerInfo {
    pub peer_id: String,
    pub session_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Thread-safe map of peer identifier → live session.
///
/// Invariant: at most one session per identifier, and a session is
/// reachable here if and only if it is `Active`.  Registering over an
/// occupied identifier atomically evicts the previous occupant (it is
/// moved to `Closing` before the lock is released, so no lookup can
/// return a session mid-eviction).
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, Arc<PeerSession>>>,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Install `session` as the live connection for its peer id.  Any
    /// previous occupant is evicted (transitioned to `Closing`) and
    /// returned so the caller can log or observe it; its transport
    /// teardown proceeds asynchronously in its owning adapter.
    pub fn register(&self, session: Arc<PeerSession>) -> Option<Arc<PeerSession>> {
        let peer_id = session.peer_id().to_string();
        let session_id = session.session_id().to_string();

        let evicted = {
            let mut peers = self.peers.write();
            let evicted = peers.insert(peer_id.clone(), session);
            if let Some(old) = &evicted {
                old.begin_close();
            }
            evicted
        };

        match &evicted {
            Some(old) => tracing::info!(
                peer_id = %peer_id,
                session_id = %session_id,
                evicted_session_id = %old.session_id(),
                "peer re-registered, previous connection evicted"
            ),
            None => tracing::info!(
                peer_id = %peer_id,
                session_id = %session_id,
                "peer registered"
            ),
        }

        evicted
    }

    /// Remove `session_id`'s entry for `peer_id` — but only if it is still
    /// the installed occupant.  A stale deregister from an evicted
    /// connection must not disturb its replacement.  Returns whether an
    /// entry was removed.
    pub fn deregister(&self, peer_id: &str, session_id: &str) -> bool {
        let removed = {
            let mut peers = self.peers.write();
            let is_current = peers
                .get(peer_id)
                .is_some_and(|cur| cur.session_id() == session_id);
            if is_current {
                if let Some(session) = peers.remove(peer_id) {
                    session.begin_close();
                }
            }
            is_current
        };

        if removed {
            tracing::info!(peer_id = %peer_id, session_id = %session_id, "peer deregistered");
        } else {
            tracing::debug!(
                peer_id = %peer_id,
                session_id = %session_id,
                "stale deregister ignored"
            );
        }
        removed
    }

    /// Current live session for `peer_id`, if any.  Snapshot read: a
    /// session that is being evicted is never returned.
    pub fn lookup(&self, peer_id: &str) -> Option<Arc<PeerSession>> {
        self.peers
            .read()
            .get(peer_id)
            .filter(|s| s.is_active())
            .cloned()
    }

    /// Update the last-seen timestamp (called on pong or any inbound frame).
    pub fn touch(&self, peer_id: &str) {
        if let Some(session) = self.peers.read().get(peer_id) {
            session.touch();
        }
    }

    /// List all connected peers.
    pub fn list(&self) -> Vec<PeerInfo> {
        self.peers
            .read()
            .values()
            .map(|s| PeerInfo {
                peer_id: s.peer_id().to_string(),
                session_id: s.session_id().to_string(),
                connected_at: s.connected_at(),
                last_seen: s.last_seen(),
            })
            .collect()
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use tokio::sync::mpsc;

    fn session(peer_id: &str) -> Arc<PeerSession> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(PeerSession::new(peer_id, tx))
    }

    #[test]
    fn register_and_lookup() {
        let reg = PeerRegistry::new();
        let s = session("a");
        assert!(reg.register(s.clone()).is_none());
        assert_eq!(reg.len(), 1);

        let found = reg.lookup("a").expect("peer should be registered");
        assert_eq!(found.session_id(), s.session_id());
        assert!(reg.lookup("b").is_none());
    }

    #[test]
    fn register_evicts_previous_occupant() {
        let reg = PeerRegistry::new();
        let s1 = session("a");
        let s2 = session("a");

        reg.register(s1.clone());
        let evicted = reg.register(s2.clone()).expect("s1 should be evicted");

        assert_eq!(evicted.session_id(), s1.session_id());
        assert_eq!(s1.state(), SessionState::Closing);
        assert!(s1.closing().is_cancelled());

        // lookup must return the replacement, never the evicted session.
        let found = reg.lookup("a").expect("replacement should be installed");
        assert_eq!(found.session_id(), s2.session_id());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn stale_deregister_does_not_disturb_replacement() {
        let reg = PeerRegistry::new();
        let s1 = session("a");
        let s2 = session("a");

        reg.register(s1.clone());
        reg.register(s2.clone());

        // s1's adapter runs its teardown after being evicted.
        assert!(!reg.deregister("a", s1.session_id()));

        let found = reg.lookup("a").expect("s2 must survive the stale deregister");
        assert_eq!(found.session_id(), s2.session_id());
    }

    #[test]
    fn deregister_removes_current_occupant() {
        let reg = PeerRegistry::new();
        let s = session("a");
        reg.register(s.clone());

        assert!(reg.deregister("a", s.session_id()));
        assert!(reg.lookup("a").is_none());
        assert!(reg.is_empty());
        assert_eq!(s.state(), SessionState::Closing);
    }

    #[test]
    fn lookup_skips_non_active_session() {
        let reg = PeerRegistry::new();
        let s = session("a");
        reg.register(s.clone());

        // Simulate an in-flight eviction observed between map read and use.
        s.begin_close();
        assert!(reg.lookup("a").is_none());
    }

    #[test]
    fn concurrent_registration_keeps_single_occupant() {
        let reg = Arc::new(PeerRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        reg.register(session("a"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(reg.len(), 1);
        let survivor = reg.lookup("a").expect("one session must win");
        assert!(survivor.is_active());
    }

    #[test]
    fn list_reports_connected_peers() {
        let reg = PeerRegistry::new();
        reg.register(session("a"));
        reg.register(session("b"));

        let mut peers = reg.list();
        peers.sort_by(|x, y| x.peer_id.cmp(&y.peer_id));
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].peer_id, "a");
        assert_eq!(peers[1].peer_id, "b");
    }
}
