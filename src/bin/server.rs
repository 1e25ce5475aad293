//! HTTP Server for the chat API

use clap::Parser;
use sqlchat::config::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    info!("Starting sqlchat API server...");
    info!("Databases will be stored in {}", config.data_dir.display());
    info!("Sessions expire after {} hours", config.session_timeout_hours);

    sqlchat::server::run(config).await
}
