use anyhow::Context;
use tracing_subscriber::EnvFilter;

use domohubd::Daemon;
use domohubd::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("unable to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).context("invalid log filter")?,
        )
        .init();

    tracing::info!(
        hardware = config.hardware.len(),
        devices = config.devices.len(),
        "configuration loaded"
    );

    let daemon = Daemon::start(config).await;

    tokio::signal::ctrl_c()
        .await
        .context("unable to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    daemon.shutdown().await;
    Ok(())
}
