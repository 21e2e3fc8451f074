//! # Channel Hub
//!
//! Application entry point. Initializes logging, loads configuration,
//! connects to PostgreSQL and serves the hub until stopped.

use anyhow::Result;
use tracing::info;

use channel_hub::config::Settings;
use channel_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    channel_hub::telemetry::init_tracing();

    info!("Starting Channel Hub...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
