//! # Gateway Errors

use cg_01_request_lifecycle::LifecycleError;
use shared_types::RequestId;
use thiserror::Error;

/// Errors raised by a computation adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    /// The payload is not a well-formed ciphertext for this program.
    #[error("Malformed ciphertext: {0}")]
    MalformedInput(String),

    /// The program would exceed the declared budget.
    #[error("Budget exceeded: needed {needed}, declared {budget}")]
    BudgetExceeded {
        /// Declared budget.
        budget: u64,
        /// Units required.
        needed: u64,
    },

    /// The adapter produced no result.
    #[error("Computation produced an empty result")]
    EmptyResult,

    /// Key material or a backend is unavailable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the gateway worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The ledger refused a gateway call.
    #[error("Ledger rejected call: {0}")]
    Ledger(#[from] LifecycleError),

    /// The adapter failed.
    #[error("Computation failed: {0}")]
    Compute(#[from] ComputeError),

    /// The adapter did not finish in time.
    #[error("Computation for request {id} timed out after {timeout_ms} ms")]
    ComputeTimeout {
        /// Request being computed.
        id: RequestId,
        /// Applied limit.
        timeout_ms: u64,
    },

    /// A configuration value failed to parse or validate.
    #[error("Invalid gateway config {key}={value}")]
    InvalidConfig {
        /// Variable or field name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}
