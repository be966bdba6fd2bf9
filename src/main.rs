//! Binary entry point for the community backend.
//!
//! The runtime logic lives in `ecg_community::server`; this binary installs
//! the log subscriber and delegates.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    ecg_community::server::run().await
}
