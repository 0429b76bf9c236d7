//! Tiercache Server binary.

use anyhow::Context;
use tiercache_server::metrics::init_metrics;
use tiercache_server::{Settings, run_server_with_state, start_instance};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("TIERCACHE_CONFIG").ok();
    let settings = Settings::load(config_path.as_deref()).context("failed to load settings")?;
    let addr = settings.socket_addr()?;

    tracing::info!(
        "Starting Tiercache Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Origin: {}", settings.origin.base_url);

    let prometheus_handle = init_metrics().context("failed to install metrics recorder")?;

    let instance = start_instance(&settings).await?;

    run_server_with_state(addr, instance.state, prometheus_handle).await?;

    instance.listener.shutdown().await;
    tracing::info!("Tiercache Server stopped");

    Ok(())
}
