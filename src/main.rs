//! media-dl server binary
//!
//! Loads `.env`, reads configuration from the environment, serves the API
//! until SIGINT/SIGTERM, then drains running jobs.

use media_dl::config::env_keys;
use media_dl::tunnel::Tunnel;
use media_dl::{Config, MediaDownloader, api};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "media_dl=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        bind = %config.server.bind_address,
        output_dir = %config.output_dir().display(),
        direct_timeout = ?config.direct.timeout,
        "configuration loaded"
    );

    let downloader = Arc::new(MediaDownloader::new(config.clone()).await?);
    let sweeper = downloader.start_cleanup_sweeper();

    let tunnel = if config.tunnel.enabled {
        match Tunnel::open(&config.tunnel, config.server.bind_address.port()).await {
            Ok(tunnel) => {
                tracing::info!(public_url = tunnel.public_url(), "public tunnel ready");
                Some(tunnel)
            }
            Err(e) => {
                tracing::warn!(error = %e, "tunnel unavailable, serving on the local network only");
                None
            }
        }
    } else {
        None
    };

    let served = api::start_api_server(
        downloader.clone(),
        downloader.get_config(),
        media_dl::shutdown_signal(),
    )
    .await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "API server failed");
    }

    downloader.shutdown().await;
    sweeper.abort();
    if let Some(tunnel) = tunnel {
        tunnel.close().await;
    }

    served.map_err(Into::into)
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(env_keys::LOG_JSON).is_ok_and(|v| v == "1" || v == "true");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}
