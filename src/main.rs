//! reel-dl server binary
//!
//! Reads configuration from the environment (and `.env`), then serves the
//! API until SIGINT/SIGTERM.

use reel_dl::{Config, ReelService, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let service = Arc::new(ReelService::new(config).await?);

    let capabilities = service.capabilities();
    if !capabilities.can_download {
        tracing::warn!(
            fetcher = %capabilities.fetcher,
            transcoder = %capabilities.transcoder,
            "instaloader or ffmpeg not found; reel requests will fail until both are installed"
        );
    }

    run_with_shutdown(service).await?;
    Ok(())
}
