//! Message router — resolves a recipient to its live session and performs
//! one bounded delivery attempt.
//!
//! Routing rules:
//! 1. No session registered under the recipient → `RecipientOffline`.
//! 2. Session found → push onto its outbound channel, waiting at most the
//!    configured delivery timeout.  Timeout → `RecipientUnreachable`
//!    (attempt abandoned, never retried).
//! 3. Channel discovered closed (the session was evicted between lookup
//!    and push) → one retried lookup+push, then `RecipientOffline`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;

use crate::registry::PeerRegistry;
use crate::session::OutboundMessage;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The result of a delivery attempt.  Offline and unreachable are normal
/// outcomes, not errors — the process never treats them as faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The message was handed to the recipient's outbound channel.
    Delivered,
    /// No live session is registered under the recipient identifier.
    RecipientOffline,
    /// The recipient is connected but did not accept the message within
    /// the delivery timeout.
    RecipientUnreachable,
}

/// Malformed input to [`MessageRouter::send`].  Never raised for offline
/// or unreachable recipients.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterError {
    #[error("sender identifier is empty")]
    EmptySender,
    #[error("recipient identifier is empty")]
    EmptyRecipient,
    #[error("message text is empty")]
    EmptyText,
}

/// Outcome of a single lookup+push, before race-absorbing retry.
enum Attempt {
    Delivered,
    Offline,
    Timeout,
    /// The session vanished between lookup and push (eviction race).
    Gone,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MessageRouter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct MessageRouter {
    registry: Arc<PeerRegistry>,
    /// Upper bound on how long one delivery may block its sender.
    delivery_timeout: Duration,
}

impl MessageRouter {
    pub fn new(registry: Arc<PeerRegistry>, delivery_timeout: Duration) -> Self {
        Self {
            registry,
            delivery_timeout,
        }
    }

    /// Route one message to `recipient`.
    ///
    /// `source_label` is what the recipient sees as the message source; it
    /// defaults to `sender` when absent.  It is opaque display text and is
    /// never resolved against the registry.
    pub async fn send(
        &self,
        sender: &str,
        recipient: &str,
        text: &str,
        source_label: Option<&str>,
    ) -> Result<DeliveryOutcome, RouterError> {
        if sender.trim().is_empty() {
            return Err(RouterError::EmptySender);
        }
        if recipient.trim().is_empty() {
            return Err(RouterError::EmptyRecipient);
        }
        if text.trim().is_empty() {
            return Err(RouterError::EmptyText);
        }

        let from = source_label.unwrap_or(sender);

        let outcome = match self.attempt(recipient, from, text).await {
            Attempt::Delivered => DeliveryOutcome::Delivered,
            Attempt::Offline => DeliveryOutcome::RecipientOffline,
            Attempt::Timeout => DeliveryOutcome::RecipientUnreachable,
            Attempt::Gone => {
                // The recipient's session was evicted between lookup and
                // push.  Retry the lookup once — a reconnect may already
                // have installed a replacement.
                tracing::debug!(
                    recipient = %recipient,
                    "recipient session closed mid-delivery, retrying lookup once"
                );
                match self.attempt(recipient, from, text).await {
                    Attempt::Delivered => DeliveryOutcome::Delivered,
                    Attempt::Timeout => DeliveryOutcome::RecipientUnreachable,
                    Attempt::Offline | Attempt::Gone => DeliveryOutcome::RecipientOffline,
                }
            }
        };

        tracing::debug!(
            sender = %sender,
            recipient = %recipient,
            outcome = ?outcome,
            "message routed"
        );
        Ok(outcome)
    }

    /// One lookup + one bounded push.  Never blocks past the timeout.
    async fn attempt(&self, recipient: &str, from: &str, text: &str) -> Attempt {
        let session = match self.registry.lookup(recipient) {
            Some(s) => s,
            None => return Attempt::Offline,
        };

        let msg = OutboundMessage {
            from: from.to_string(),
            text: text.to_string(),
        };
        match session.outbound().send_timeout(msg, self.delivery_timeout).await {
            Ok(()) => Attempt::Delivered,
            Err(SendTimeoutError::Timeout(_)) => Attempt::Timeout,
            Err(SendTimeoutError::Closed(_)) => Attempt::Gone,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
