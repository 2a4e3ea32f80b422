//! # Lifecycle Configuration
//!
//! Bounds applied by the engine, loadable from environment variables.

use serde::{Deserialize, Serialize};
use shared_types::U256;
use std::env;
use thiserror::Error;

/// Default per-request timeout (1 hour).
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Upper bound for any timeout (7 days).
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// Largest accepted payload (128 KiB).
pub const MAX_PAYLOAD_BYTES: usize = 128 * 1024;

/// Largest accepted failure reason.
pub const MAX_REASON_BYTES: usize = 256;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Values are individually valid but contradict each other.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Lifecycle engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Timeout applied when `submit` passes none.
    pub default_timeout_secs: u64,
    /// Largest timeout a request or the default may use.
    pub max_timeout_secs: u64,
    /// Smallest escrow `submit` accepts, in wei.
    pub min_escrow: U256,
    /// Largest payload `submit` accepts.
    pub max_payload_bytes: usize,
    /// Largest reason `report_failure` accepts.
    pub max_reason_bytes: usize,
    /// Enables the owner's `admin_force_refund`.
    pub allow_admin_force_refund: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_timeout_secs: MAX_TIMEOUT_SECS,
            min_escrow: U256::zero(),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            max_reason_bytes: MAX_REASON_BYTES,
            allow_admin_force_refund: false,
        }
    }
}

impl LifecycleConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CG_DEFAULT_TIMEOUT_SECS` (default: 3600)
    /// - `CG_MAX_TIMEOUT_SECS` (default: 604800)
    /// - `CG_MIN_ESCROW_WEI`: decimal wei (default: 0)
    /// - `CG_MAX_PAYLOAD_BYTES` (default: 131072)
    /// - `CG_MAX_REASON_BYTES` (default: 256)
    /// - `CG_ALLOW_ADMIN_FORCE_REFUND` (default: false)
    ///
    /// Unset variables keep their default; unparsable ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            default_timeout_secs: parse_or(
                &lookup,
                "CG_DEFAULT_TIMEOUT_SECS",
                defaults.default_timeout_secs,
            )?,
            max_timeout_secs: parse_or(&lookup, "CG_MAX_TIMEOUT_SECS", defaults.max_timeout_secs)?,
            min_escrow: match lookup("CG_MIN_ESCROW_WEI") {
                Some(raw) => U256::from_dec_str(raw.trim()).map_err(|_| {
                    ConfigError::InvalidValue {
                        key: "CG_MIN_ESCROW_WEI",
                        value: raw,
                    }
                })?,
                None => defaults.min_escrow,
            },
            max_payload_bytes: parse_or(
                &lookup,
                "CG_MAX_PAYLOAD_BYTES",
                defaults.max_payload_bytes,
            )?,
            max_reason_bytes: parse_or(&lookup, "CG_MAX_REASON_BYTES", defaults.max_reason_bytes)?,
            allow_admin_force_refund: match lookup("CG_ALLOW_ADMIN_FORCE_REFUND") {
                Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                    key: "CG_ALLOW_ADMIN_FORCE_REFUND",
                    value: raw,
                })?,
                None => defaults.allow_admin_force_refund,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_secs == 0 {
            return Err(ConfigError::Inconsistent(
                "default timeout must be positive".into(),
            ));
        }
        if self.default_timeout_secs > self.max_timeout_secs {
            return Err(ConfigError::Inconsistent(format!(
                "default timeout {}s exceeds maximum {}s",
                self.default_timeout_secs, self.max_timeout_secs
            )));
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Inconsistent(
                "payload limit must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Validate a caller-supplied timeout duration.
    pub fn check_timeout(&self, duration: u64) -> Result<(), String> {
        if duration == 0 {
            return Err("timeout duration is zero".into());
        }
        if duration > self.max_timeout_secs {
            return Err(format!(
                "timeout {duration}s exceeds maximum {}s",
                self.max_timeout_secs
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
