//! Chat shell entry point
//!
//! Run with:
//! ```bash
//! CHAT_API_URL=http://localhost:8000 CHAT_USER_ID=1 cargo run -p mememori-cli -- <item-id>
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

use anyhow::Context;
use mememori_common::{try_init_tracing_with_config, ClientConfig, TracingConfig};
use mememori_core::ItemId;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Chat shell failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    let item_id = std::env::args()
        .nth(1)
        .filter(|arg| !arg.trim().is_empty())
        .context("usage: mememori-cli <item-id>")?;

    info!(app = %config.app.name, env = ?config.app.env, "Configuration loaded");
    mememori_cli::run(config, ItemId::new(item_id)).await?;
    Ok(())
}
