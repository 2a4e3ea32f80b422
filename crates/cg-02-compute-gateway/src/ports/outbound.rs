//! # Outbound Ports

use crate::domain::{ComputeError, ComputeOutput, ComputeRequest};
use async_trait::async_trait;

/// A program that computes over an encrypted payload and returns an
/// encrypted result.
///
/// The gateway never inspects either side: both are opaque ciphertext.
#[async_trait]
pub trait ComputeOverCiphertext: Send + Sync {
    /// Program name, for logs.
    fn name(&self) -> &str;

    /// Run the program on one job.
    async fn compute(&self, request: ComputeRequest) -> Result<ComputeOutput, ComputeError>;
}
