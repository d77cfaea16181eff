pub mod chat;
pub mod config;

use clap::{Parser, Subcommand};

/// Peerline — a realtime message relay for UUID-addressed peers.
#[derive(Debug, Parser)]
#[command(name = "peerline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the relay server (default when no subcommand is given).
    Serve,
    /// Connect to a relay as a peer and chat from the terminal.
    Chat {
        /// Your peer UUID.  Generated fresh when omitted.
        #[arg(long)]
        uuid: Option<String>,
        /// Default recipient UUID.  Without it, prefix each line with
        /// `<uuid> <text>`.
        #[arg(long)]
        peer: Option<String>,
        /// Relay WebSocket URL.
        #[arg(long, default_value = "ws://127.0.0.1:8000/v1/peers/ws")]
        url: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path named by `PEERLINE_CONFIG` (or
/// `config.toml` by default).  Returns the parsed config and the path
/// that was used; a missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(pl_domain::config::Config, String)> {
    let config_path =
        std::env::var("PEERLINE_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = pl_domain::config::Config::load(&config_path)
        .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?;

    Ok((config, config_path))
}
