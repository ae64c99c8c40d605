//! Tracing configuration types.

use serde::Deserialize;

/// Configuration for the logging subsystem.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// Service name attached to the startup event.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log level filter (e.g. "info", "debug", "reqid_relay=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format for log lines.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_service_name() -> String {
    "reqid".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_service_neutral() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "reqid");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
