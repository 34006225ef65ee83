//! Loyalty sync worker entry point
//!
//! Run with:
//! ```bash
//! cargo run -p loyalty-worker            # pull, then follow changes until Ctrl-C
//! cargo run -p loyalty-worker -- unify   # fold duplicate accounts once
//! ```
//!
//! Configuration is loaded from environment variables.

use loyalty_common::{try_init_tracing, AppConfig};
use loyalty_worker::Command;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Worker failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let command = Command::parse(std::env::args().skip(1))?;
    info!(command = %command, "Starting loyalty worker...");

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        cooldown_ms = config.sync.cooldown_ms,
        "Configuration loaded"
    );

    loyalty_worker::run(config, command).await?;

    Ok(())
}
