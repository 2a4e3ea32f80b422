//! # Node Configuration
//!
//! Unified configuration for the engine, the worker and telemetry.
//!
//! ## Security Requirements
//!
//! - Owner, gateway and contract identities MUST be set explicitly; there
//!   are no defaults and the zero address is refused
//! - Every numeric bound has a default with an environment override

use cg_01_request_lifecycle::{ConfigError, LifecycleConfig};
use cg_02_compute_gateway::{GatewayError, GatewayWorkerConfig};
use gateway_telemetry::TelemetryConfig;
use shared_types::Address;
use std::env;
use thiserror::Error;

/// Owner identity, `0x`-prefixed hex.
pub const ENV_OWNER: &str = "CG_OWNER_ADDRESS";
/// Gateway identity, `0x`-prefixed hex.
pub const ENV_GATEWAY: &str = "CG_GATEWAY_ADDRESS";
/// Contract account holding escrow, `0x`-prefixed hex.
pub const ENV_CONTRACT: &str = "CG_CONTRACT_ADDRESS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum NodeConfigError {
    /// A required identity is not set.
    #[error("Missing {0}; identities have no default")]
    Missing(&'static str),

    /// An identity is not 20 bytes of hex, or is zero.
    #[error("Invalid address in {key}: {value:?}")]
    InvalidAddress {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Lifecycle bounds rejected.
    #[error(transparent)]
    Lifecycle(#[from] ConfigError),

    /// Worker settings rejected.
    #[error(transparent)]
    Worker(#[from] GatewayError),
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Contract owner.
    pub owner: Address,
    /// Initial gateway; also the identity the local worker acts as.
    pub gateway: Address,
    /// Contract account.
    pub contract: Address,
    /// Engine bounds.
    pub lifecycle: LifecycleConfig,
    /// Worker settings.
    pub worker: GatewayWorkerConfig,
    /// Log output.
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Load everything from the process environment.
    pub fn from_env() -> Result<Self, NodeConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Telemetry settings always come
    /// from the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NodeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            owner: required_address(&lookup, ENV_OWNER)?,
            gateway: required_address(&lookup, ENV_GATEWAY)?,
            contract: required_address(&lookup, ENV_CONTRACT)?,
            lifecycle: LifecycleConfig::from_lookup(&lookup)?,
            worker: GatewayWorkerConfig::from_lookup(&lookup)?,
            telemetry: TelemetryConfig::from_env(),
        })
    }
}

fn required_address<F>(lookup: &F, key: &'static str) -> Result<Address, NodeConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(NodeConfigError::Missing(key))?;
    parse_address(&raw).ok_or(NodeConfigError::InvalidAddress { key, value: raw })
}

/// Parse a non-zero 20-byte address, with or without `0x`.
pub fn parse_address(raw: &str) -> Option<Address> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).ok()?;
    let address: Address = bytes.try_into().ok()?;
    (address != Address::default()).then_some(address)
}
