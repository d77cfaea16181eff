//! Peer protocol: the WebSocket message types exchanged between the relay
//! and its peers.
//!
//! Every frame is a JSON object with a `type` tag.  A peer registers its
//! UUID immediately after connecting, then exchanges `send`/`deliver`
//! frames with the relay.  Delivery outcomes are reported per message so a
//! sender can tell an offline recipient from a stalled one.

use serde::{Deserialize, Serialize};

/// Bumped on incompatible wire changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Peer → Relay: claim a UUID.  Must be the first frame.
    #[serde(rename = "register")]
    Register { uuid: String },

    /// Relay → Peer: registration accepted.  `session_id` names this
    /// particular connection (a reconnect gets a fresh one).
    #[serde(rename = "registered")]
    Registered { uuid: String, session_id: String },

    /// Peer → Relay: relay `text` to the peer registered as `to_uuid`.
    #[serde(rename = "send")]
    Send { to_uuid: String, text: String },

    /// Relay → Peer: a message addressed to this peer.  `from` is display
    /// text (the sender's UUID, or the submitter's name for API-submitted
    /// messages) — it is never resolved back into a routable identifier.
    #[serde(rename = "deliver")]
    Deliver { from: String, text: String },

    /// Relay → Peer: the previous `send` was handed to the recipient.
    #[serde(rename = "sent")]
    Sent { to_uuid: String },

    /// Relay → Peer: the previous `send` could not be delivered.
    #[serde(rename = "send_failed")]
    SendFailed {
        to_uuid: String,
        reason: DeliveryFailure,
    },

    /// Relay → Peer: protocol or validation error.
    #[serde(rename = "error")]
    Error { message: String },

    /// Bidirectional: heartbeat.
    #[serde(rename = "ping")]
    Ping { timestamp: i64 },

    /// Bidirectional: heartbeat response.
    #[serde(rename = "pong")]
    Pong { timestamp: i64 },
}

/// Why a `send` did not reach its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailure {
    /// No live connection is registered under the recipient UUID.
    Offline,
    /// The recipient is connected but its outbound channel did not accept
    /// the message within the delivery timeout.
    Unreachable,
}
