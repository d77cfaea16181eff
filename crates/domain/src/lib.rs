//! Shared domain types for Peerline: configuration and the common error type.

pub mod config;
pub mod error;

pub use error::{Error, Result};
