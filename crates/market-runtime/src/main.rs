//! # Task Market Runtime
//!
//! Entry point for the marketplace core.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging, metrics registry)
//! 2. Load configuration from the environment and validate it
//! 3. Build the container and start the event handlers
//! 4. Run until Ctrl+C, then shut the handlers down

use anyhow::{Context, Result};
use tracing::{debug, info};

use market_runtime::{MarketConfig, MarketRuntime};
use market_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config = MarketConfig::from_env();
    config.validate().context("invalid configuration")?;

    let runtime = MarketRuntime::new(config);
    runtime.start();

    info!("Task market is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    if let Ok(snapshot) = encode_metrics() {
        debug!("Final metrics:\n{}", snapshot);
    }
    Ok(())
}
