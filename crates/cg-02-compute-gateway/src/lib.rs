//! # CG-02 Compute Gateway
//!
//! The off-ledger half of the protocol: watches for submitted requests,
//! runs a computation over the encrypted payload and answers through the
//! ledger's gateway entry points.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Responsibilities
//!
//! | Step | Ledger call |
//! |------|-------------|
//! | Claim the job | `acknowledge` (optional) |
//! | Deliver a result | `callback` |
//! | Adapter error or timeout | `report_failure` |
//!
//! The worker holds no authority beyond the gateway identity. If the owner
//! rotates the gateway, its calls start failing with `Unauthorized`.
//!
//! ## Module Structure
//!
//! ```text
//! cg-02-compute-gateway/
//! ├── domain/          # ComputeRequest, Outcome, errors, GatewayWorkerConfig
//! ├── ports/           # ComputeOverCiphertext
//! ├── adapters/        # MockCompute
//! └── service.rs       # GatewayWorker
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{MockBehavior, MockCompute};
pub use domain::{
    ComputeError, ComputeOutput, ComputeRequest, GatewayError, GatewayWorkerConfig, Outcome,
    WorkerStats, DEFAULT_COMPUTE_TIMEOUT_MS, DEFAULT_MAX_FAILURE_REASON_LEN,
};
pub use ports::ComputeOverCiphertext;
pub use service::GatewayWorker;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
