//! reqid-relay: HTTP relay that assigns a request ID to every inbound request
//! and carries it on to the upstream service.

mod config;
mod forward;
mod server;

use std::time::Duration;

use config::RelayConfig;
use server::AppState;

fn main() -> anyhow::Result<()> {
    // Determine config path
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        // Check for --config flag first
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            // Fall back to positional arg
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("REQID_RELAY_CONFIG").ok())
            .unwrap_or_else(|| "reqid-relay.toml".to_string())
    };

    // Load configuration
    let config = RelayConfig::load(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        reqid_tracing::init_tracing(&config.tracing);

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address,
            upstream = %config.upstream.base_url,
            trust_inbound = config.request_id.trust_inbound,
            "Starting reqid-relay"
        );

        run(config).await
    })
}

async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let upstream_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.timeout_secs))
        .build()?;

    let state = AppState {
        config,
        upstream_client,
    };

    server::run(state).await
}
