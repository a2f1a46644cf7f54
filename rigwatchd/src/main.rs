//! rigwatch Daemon
//!
//! Polls NiceHash for rig telemetry and publishes a presence payload for
//! the configured mining device.
//!
//! # Usage
//!
//! ```bash
//! RIGWATCH_API_KEY=... RIGWATCH_API_SECRET=... RIGWATCH_ORG_ID=... cargo run -p rigwatchd
//!
//! # AMD card, JSON logs
//! RIGWATCH_DEVICE_BRAND=AMD RIGWATCH_LOG_FORMAT=json cargo run -p rigwatchd
//! ```
//!
//! # Environment Variables
//!
//! - `RIGWATCH_API_KEY`, `RIGWATCH_API_SECRET`, `RIGWATCH_ORG_ID`: credentials (required)
//! - `RIGWATCH_DEVICE_BRAND`: NVIDIA or AMD (default: NVIDIA)
//! - `RIGWATCH_API_URL`: API base URL (default: https://api2.nicehash.com)
//! - `RIGWATCH_USER_LANG`: X-User-Lang header (default: en)
//! - `RIGWATCH_POLL_INTERVAL_SECS`: rig refresh period (default: 60)
//! - `RIGWATCH_PRESENCE_INTERVAL_SECS`: presence tick period (default: 1)
//! - `RIGWATCH_REQUEST_TIMEOUT_SECS`: per-request deadline (default: 10)
//! - `RIGWATCH_MAX_BACKOFF_SECS`: longest wait between failing polls (default: 900)
//! - `RIGWATCH_LARGE_IMAGE_KEY`, `RIGWATCH_LARGE_IMAGE_TEXT`: presence artwork
//! - `RIGWATCH_LOG_FORMAT`: `json` for JSON logs

use rigwatchd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RIGWATCH_LOG_FORMAT as well as credentials
    let _ = dotenvy::dotenv();

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive("rigwatchd=info".parse()?);
    let json_logs = std::env::var("RIGWATCH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        brand = %config.device_brand,
        api_url = %config.api.base_url,
        poll_interval_secs = config.poller.interval.as_secs(),
        "rigwatch daemon"
    );

    // Create and run daemon
    Daemon::from_config(config).run().await?;

    Ok(())
}
