//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use reqid::RequestIdConfig;
use reqid_tracing::TracingConfig;
use serde::Deserialize;

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub request_id: RequestIdConfig,
    #[serde(default = "default_tracing")]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Inbound bodies larger than this are rejected with 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Upstream service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to; the inbound path and query are appended.
    pub base_url: String,

    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:3090".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_upstream_timeout() -> u64 {
    60
}

fn default_tracing() -> TracingConfig {
    TracingConfig {
        service_name: "reqid-relay".to_string(),
        ..TracingConfig::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (REQID_RELAY_ prefix, __ for nesting)
    /// 2. TOML config file
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let mut config: RelayConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("REQID_RELAY_").split("__"))
            .extract()?;

        // Trailing slash would double up with the forwarded path
        let trimmed = config.upstream.base_url.trim_end_matches('/').len();
        config.upstream.base_url.truncate(trimmed);

        Ok(config)
    }
}
