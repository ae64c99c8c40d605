//! Request-id middleware configuration.

use serde::Deserialize;

/// Configuration for [`request_id_middleware`](crate::middleware::request_id_middleware).
#[derive(Debug, Clone, Deserialize)]
pub struct RequestIdConfig {
    /// Reuse an ID supplied by the caller instead of always generating one.
    #[serde(default = "default_true")]
    pub trust_inbound: bool,

    /// Inbound headers checked for an existing ID, in priority order.
    #[serde(default = "default_inbound_headers")]
    pub inbound_headers: Vec<String>,

    /// Inbound IDs longer than this are ignored.
    #[serde(default = "default_max_inbound_len")]
    pub max_inbound_len: usize,

    /// Set `X-Request-ID` on responses.
    #[serde(default = "default_true")]
    pub echo_response: bool,

    /// Deadline applied to each request's context.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_inbound_headers() -> Vec<String> {
    vec!["x-request-id".to_string(), "x-correlation-id".to_string()]
}

fn default_max_inbound_len() -> usize {
    128
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            trust_inbound: default_true(),
            inbound_headers: default_inbound_headers(),
            max_inbound_len: default_max_inbound_len(),
            echo_response: default_true(),
            request_timeout_secs: None,
        }
    }
}
