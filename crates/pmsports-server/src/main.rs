//! pmsports - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Sports prediction-market stats service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PMSPORTS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection is made
    pmsports_ws::init_crypto();

    let args = Args::parse();

    pmsports_telemetry::init_logging()?;

    info!("Starting pmsports v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > PMSPORTS_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PMSPORTS_CONFIG").ok())
        .unwrap_or_else(|| pmsports_server::config::DEFAULT_CONFIG_PATH.to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = pmsports_server::AppConfig::load(&config_path)?;
    info!(
        api_url = %config.api_url,
        port = config.dashboard.port,
        feed_enabled = config.feed.enabled,
        "Configuration loaded"
    );

    let app = pmsports_server::Application::new(config)?;
    app.run().await?;

    Ok(())
}
