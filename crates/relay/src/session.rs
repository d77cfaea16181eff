//! A single live connection bound to one peer identifier.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle of a session.  Transitions are linear: `Active` → `Closing`
/// → `Closed`, with no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered and eligible as a delivery target.
    Active,
    /// Disconnect detected or evicted by a newer registration; no longer
    /// a delivery target, transport teardown in progress.
    Closing,
    /// Terminal; outbound resources released.
    Closed,
}

/// The payload pushed to a peer's live connection.
///
/// `from` is display text only — the sending peer's identifier, or the
/// submitter name for API-submitted messages.  It is never resolved back
/// into a routable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub text: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Peer session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One live connection.  Created by a transport adapter after a successful
/// handshake; the adapter owns teardown.  The registry only holds a lookup
/// reference and never extends the session's lifetime.
pub struct PeerSession {
    peer_id: String,
    /// Distinguishes this connection from a later one under the same
    /// peer id (a reconnect gets a fresh session id).
    session_id: String,
    connected_at: DateTime<Utc>,
    last_seen: Mutex<DateTime<Utc>>,
    outbound: mpsc::Sender<OutboundMessage>,
    state: Mutex<SessionState>,
    /// Cancelled when the session leaves `Active`.  The owning adapter
    /// watches this to learn about eviction.
    closing: CancellationToken,
}

impl PeerSession {
    pub fn new(peer_id: impl Into<String>, outbound: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            peer_id: peer_id.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            connected_at: now,
            last_seen: Mutex::new(now),
            outbound,
            state: Mutex::new(SessionState::Active),
            closing: CancellationToken::new(),
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        *self.last_seen.lock()
    }

    /// Update the last-activity timestamp (heartbeat or any inbound frame).
    pub fn touch(&self) {
        *self.last_seen.lock() = Utc::now();
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// The sink used by the router to push a message to this connection.
    pub(crate) fn outbound(&self) -> &mpsc::Sender<OutboundMessage> {
        &self.outbound
    }

    /// A token that fires once the session leaves `Active`.  The owning
    /// adapter selects on this to tear the transport down on eviction.
    pub fn closing(&self) -> CancellationToken {
        self.closing.clone()
    }

    /// `Active` → `Closing`.  Returns `true` if this call performed the
    /// transition; repeated calls (and calls on a `Closed` session) are
    /// no-ops.
    pub fn begin_close(&self) -> bool {
        let mut state = self.state.lock();
        if *state != SessionState::Active {
            return false;
        }
        *state = SessionState::Closing;
        self.closing.cancel();
        true
    }

    /// → `Closed`.  Called by the owning adapter once the transport is
    /// torn down and the outbound receiver is dropped.
    pub fn finish_close(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::Active {
            // Adapter-detected disconnect skips the explicit begin_close.
            self.closing.cancel();
        }
        *state = SessionState::Closed;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> PeerSession {
        let (tx, _rx) = mpsc::channel(1);
        PeerSession::new("peer-1", tx)
    }

    #[test]
    fn new_session_is_active() {
        let s = session();
        assert_eq!(s.state(), SessionState::Active);
        assert!(s.is_active());
        assert!(!s.closing().is_cancelled());
    }

    #[test]
    fn begin_close_is_linear_and_idempotent() {
        let s = session();
        assert!(s.begin_close());
        assert_eq!(s.state(), SessionState::Closing);
        assert!(s.closing().is_cancelled());

        // Second call is a no-op.
        assert!(!s.begin_close());
        assert_eq!(s.state(), SessionState::Closing);

        s.finish_close();
        assert_eq!(s.state(), SessionState::Closed);
        assert!(!s.begin_close());
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[test]
    fn finish_close_from_active_cancels_token() {
        let s = session();
        s.finish_close();
        assert_eq!(s.state(), SessionState::Closed);
        assert!(s.closing().is_cancelled());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = session();
        let b = session();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn touch_advances_last_seen() {
        let s = session();
        let before = s.last_seen();
        std::thread::sleep(std::time::Duration::from_millis(5));
        s.touch();
        assert!(s.last_seen() > before);
    }
}
