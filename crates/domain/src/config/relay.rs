use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Relay (registry + router)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// How long a delivery may wait on a recipient's outbound channel
    /// before the attempt is abandoned and reported as unreachable.
    #[serde(default = "d_delivery_timeout")]
    pub delivery_timeout_secs: u64,
    /// Capacity of each peer's outbound channel.  A peer that stops
    /// draining its socket stalls deliveries once this buffer is full.
    #[serde(default = "d_outbound_buffer")]
    pub outbound_buffer: usize,
    /// How long a freshly connected peer has to send its `register`
    /// frame before the socket is dropped.
    #[serde(default = "d_register_timeout")]
    pub register_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: d_delivery_timeout(),
            outbound_buffer: d_outbound_buffer(),
            register_timeout_secs: d_register_timeout(),
        }
    }
}

impl RelayConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn register_timeout(&self) -> Duration {
        Duration::from_secs(self.register_timeout_secs)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_delivery_timeout() -> u64 {
    5
}
fn d_outbound_buffer() -> usize {
    64
}
fn d_register_timeout() -> u64 {
    10
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_all_defaults() {
        let cfg: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.delivery_timeout_secs, 5);
        assert_eq!(cfg.outbound_buffer, 64);
        assert_eq!(cfg.register_timeout_secs, 10);
    }

    #[test]
    fn duration_helpers_convert_seconds() {
        let cfg = RelayConfig {
            delivery_timeout_secs: 2,
            outbound_buffer: 8,
            register_timeout_secs: 3,
        };
        assert_eq!(cfg.delivery_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.register_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn parses_overrides() {
        let toml_str = r#"
            delivery_timeout_secs = 1
            outbound_buffer = 4
        "#;
        let cfg: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.delivery_timeout_secs, 1);
        assert_eq!(cfg.outbound_buffer, 4);
        assert_eq!(cfg.register_timeout_secs, 10);
    }
}
