//! The relay core: connection registry and delivery engine.
//!
//! Peers register an opaque identifier and hold exactly one live session
//! each; messages addressed to an identifier are pushed to that session's
//! outbound channel with at-most-one delivery per message.  Transport
//! adapters (WebSocket, HTTP submission, console client) live in the
//! gateway crate and talk to this core through a narrow interface:
//! [`PeerRegistry::register`], [`PeerRegistry::deregister`],
//! [`MessageRouter::send`], and [`PeerRegistry::lookup`].

pub mod registry;
pub mod router;
pub mod session;

pub use registry::{PeerInfo, PeerRegistry};
pub use router::{DeliveryOutcome, MessageRouter, RouterError};
pub use session::{OutboundMessage, PeerSession, SessionState};
