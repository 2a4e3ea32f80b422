//! # Domain Module
//!
//! Jobs, outcomes, errors and configuration of the compute gateway.

pub mod compute;
pub mod config;
pub mod errors;

pub use compute::{ComputeOutput, ComputeRequest, Outcome, WorkerStats};
pub use config::{GatewayWorkerConfig, DEFAULT_COMPUTE_TIMEOUT_MS, DEFAULT_MAX_FAILURE_REASON_LEN};
pub use errors::{ComputeError, GatewayError};
