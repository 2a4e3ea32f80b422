//! # Worker Configuration

use super::errors::GatewayError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default per-job compute limit (30 seconds).
pub const DEFAULT_COMPUTE_TIMEOUT_MS: u64 = 30_000;

/// Default cap on reported failure reasons. Matches the ledger's own limit.
pub const DEFAULT_MAX_FAILURE_REASON_LEN: usize = 256;

/// Gateway worker configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayWorkerConfig {
    /// Time limit for one computation.
    pub compute_timeout_ms: u64,
    /// Move requests to `Processing` before computing.
    pub acknowledge_before_compute: bool,
    /// Failure reasons are truncated to this many bytes.
    pub max_failure_reason_len: usize,
}

impl Default for GatewayWorkerConfig {
    fn default() -> Self {
        Self {
            compute_timeout_ms: DEFAULT_COMPUTE_TIMEOUT_MS,
            acknowledge_before_compute: true,
            max_failure_reason_len: DEFAULT_MAX_FAILURE_REASON_LEN,
        }
    }
}

impl GatewayWorkerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CG_COMPUTE_TIMEOUT_MS` (default: 30000)
    /// - `CG_ACKNOWLEDGE_BEFORE_COMPUTE` (default: true)
    /// - `CG_MAX_FAILURE_REASON_LEN` (default: 256)
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let invalid = |key: &'static str, value: String| GatewayError::InvalidConfig { key, value };

        let compute_timeout_ms = match lookup("CG_COMPUTE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => return Err(invalid("CG_COMPUTE_TIMEOUT_MS", raw)),
            },
            None => defaults.compute_timeout_ms,
        };
        let acknowledge_before_compute = match lookup("CG_ACKNOWLEDGE_BEFORE_COMPUTE") {
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid("CG_ACKNOWLEDGE_BEFORE_COMPUTE", raw)),
            },
            None => defaults.acknowledge_before_compute,
        };
        let max_failure_reason_len = match lookup("CG_MAX_FAILURE_REASON_LEN") {
            // Zero would truncate every reason to the empty string.
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(len) if len > 0 => len,
                _ => return Err(invalid("CG_MAX_FAILURE_REASON_LEN", raw)),
            },
            None => defaults.max_failure_reason_len,
        };

        Ok(Self {
            compute_timeout_ms,
            acknowledge_before_compute,
            max_failure_reason_len,
        })
    }

    /// Compute limit as a `Duration`.
    pub fn compute_timeout(&self) -> Duration {
        Duration::from_millis(self.compute_timeout_ms)
    }

    /// Cut `reason` to the configured length on a char boundary.
    pub fn truncate_reason(&self, mut reason: String) -> String {
        if reason.len() > self.max_failure_reason_len {
            let mut cut = self.max_failure_reason_len;
            while !reason.is_char_boundary(cut) {
                cut -= 1;
            }
            reason.truncate(cut);
        }
        reason
    }
}
