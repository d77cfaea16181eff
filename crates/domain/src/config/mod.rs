mod observability;
mod relay;
mod server;

pub use observability::*;
pub use relay::*;
pub use server::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load the configuration from a TOML file.  A missing file is not an
    /// error — the defaults are used so `peerline` runs out of the box.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Sanity-check the resolved configuration.  Returns a list of
    /// human-readable issues; an empty list means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.relay.delivery_timeout_secs == 0 {
            issues.push("relay.delivery_timeout_secs must be at least 1".into());
        }
        if self.relay.outbound_buffer == 0 {
            issues.push("relay.outbound_buffer must be at least 1".into());
        }
        if self.relay.register_timeout_secs == 0 {
            issues.push("relay.register_timeout_secs must be at least 1".into());
        }
        if self.server.max_concurrent_requests == 0 {
            issues.push("server.max_concurrent_requests must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            issues.push(format!(
                "observability.sample_rate must be between 0.0 and 1.0 (got {})",
                self.observability.sample_rate
            ));
        }
        if self.server.cors.allowed_origins.is_empty() {
            issues.push("server.cors.allowed_origins is empty; no browser origin can connect".into());
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_uses_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.relay.delivery_timeout_secs, 5);
        assert!(cfg.observability.otlp_endpoint.is_none());
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = Config::load("/nonexistent/peerline.toml").unwrap();
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn load_parses_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [server]
            port = 9000

            [relay]
            delivery_timeout_secs = 2
            "#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.relay.delivery_timeout_secs, 2);
        // Untouched section keeps its defaults.
        assert_eq!(cfg.relay.outbound_buffer, 64);
    }

    #[test]
    fn validate_flags_zeroed_timeouts() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_empty());

        cfg.relay.delivery_timeout_secs = 0;
        cfg.observability.sample_rate = 2.0;
        let issues = cfg.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("delivery_timeout_secs"));
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server]\nport = \"not a number\"").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
