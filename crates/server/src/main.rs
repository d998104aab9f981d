//! Meteora LP gateway binary.
use anyhow::Result;
use dotenv::dotenv;
use meteora_lp_api::{ApiServer, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Meteora LP gateway");

    ApiServer::new(config).run().await?;
    Ok(())
}
