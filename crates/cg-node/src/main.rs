//! # Cipher-Gateway Node
//!
//! Entry point: one contract deployment plus its gateway worker, using the
//! reference program until a real ciphertext backend is plugged in.

use std::sync::Arc;

use anyhow::{Context, Result};
use cg_02_compute_gateway::MockCompute;
use cg_node::{GatewayNode, NodeConfig, VERSION};
use gateway_telemetry::init_telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load node configuration")?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;
    info!(version = VERSION, "Starting cipher-gateway node");

    let program = Arc::new(MockCompute::reversing());
    let node = GatewayNode::start(config, program).context("Failed to start gateway node")?;

    // Keep the node running
    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await;
    Ok(())
}
