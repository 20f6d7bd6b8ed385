//! Server configuration for Shellgate.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `SHELLGATE_*` environment variables.

use std::net::SocketAddr;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use shellgate_core::crypto::MasterKey;

/// Hard ceiling on the SSH connect timeout. A connect request must never
/// hang its HTTP handler longer than this.
const MAX_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Path to the JSON credentials file.
    pub credentials_file: String,
    /// Master key for opening sealed credential secrets.
    pub master_key: MasterKey,
    /// Accepted bearer tokens for the terminal API.
    pub api_tokens: Vec<String>,
    /// SSH connect timeout in seconds (clamped to 1..=30).
    pub connect_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `SHELLGATE_BIND_ADDR`: full bind address (overrides `PORT`,
    ///   default: `127.0.0.1:8322`)
    /// - `SHELLGATE_LOG_LEVEL`: log filter (default: `info`)
    /// - `SHELLGATE_CREDENTIALS_FILE`: path to the credentials file
    ///   (default: `./credentials.json`)
    /// - `SHELLGATE_MASTER_KEY`: base64-encoded 32-byte key (required)
    /// - `SHELLGATE_API_TOKENS`: comma-separated bearer tokens (required)
    /// - `SHELLGATE_CONNECT_TIMEOUT_SECS`: SSH connect timeout
    ///   (default: `20`, clamped to `30`)
    ///
    /// # Errors
    ///
    /// Fails when the master key is missing or malformed, or when no API
    /// token is configured.
    pub fn from_env() -> anyhow::Result<Self> {
        // Priority: SHELLGATE_BIND_ADDR > PORT > default 127.0.0.1:8322
        let bind_addr = if let Ok(addr) = std::env::var("SHELLGATE_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8322)))
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(8322);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 8322))
        };

        let log_level =
            std::env::var("SHELLGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        let credentials_file = std::env::var("SHELLGATE_CREDENTIALS_FILE")
            .unwrap_or_else(|_| "./credentials.json".to_owned());

        let master_key = std::env::var("SHELLGATE_MASTER_KEY")
            .context("SHELLGATE_MASTER_KEY is required")
            .and_then(|encoded| parse_master_key(&encoded))?;

        let api_tokens: Vec<String> = std::env::var("SHELLGATE_API_TOKENS")
            .context("SHELLGATE_API_TOKENS is required")?
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
        anyhow::ensure!(
            !api_tokens.is_empty(),
            "SHELLGATE_API_TOKENS must contain at least one token"
        );

        let connect_timeout_secs = std::env::var("SHELLGATE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20)
            .clamp(1, MAX_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            bind_addr,
            log_level,
            credentials_file,
            master_key,
            api_tokens,
            connect_timeout_secs,
        })
    }
}

/// Decode a base64-encoded 32-byte master key.
fn parse_master_key(encoded: &str) -> anyhow::Result<MasterKey> {
    let bytes = BASE64
        .decode(encoded.trim())
        .context("SHELLGATE_MASTER_KEY is not valid base64")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("SHELLGATE_MASTER_KEY must decode to exactly 32 bytes"))?;
    Ok(MasterKey::from_bytes(bytes))
}
