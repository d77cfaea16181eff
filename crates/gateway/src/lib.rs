//! Peerline gateway — the transport adapters and process plumbing around
//! the relay core (`pl-relay`).

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod peers;
pub mod state;
