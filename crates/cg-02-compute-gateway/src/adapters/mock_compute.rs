//! Mock computation program.
//!
//! Stands in for a real homomorphic program in tests and local runs. The
//! "result" is a deterministic transform of the input bytes.

use crate::domain::{ComputeError, ComputeOutput, ComputeRequest};
use crate::ports::ComputeOverCiphertext;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Ciphertext, RequestId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// What the mock does with a job.
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Return the payload bytes reversed. Cost is the payload length and is
    /// checked against a declared budget.
    Reverse,
    /// Fail every job with this error.
    Fail(ComputeError),
    /// Sleep, then behave like `Reverse`.
    Delay(Duration),
}

/// Configurable [`ComputeOverCiphertext`] double.
pub struct MockCompute {
    behavior: Mutex<MockBehavior>,
    calls: AtomicU64,
    seen: Mutex<Vec<RequestId>>,
}

impl MockCompute {
    /// Create a mock with the given behavior.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicU64::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Mock that reverses payloads.
    pub fn reversing() -> Self {
        Self::new(MockBehavior::Reverse)
    }

    /// Change behavior for subsequent jobs.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of jobs started.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request ids of started jobs, in order.
    pub fn seen(&self) -> Vec<RequestId> {
        self.seen.lock().clone()
    }

    /// The transform `Reverse` applies.
    pub fn expected_result(payload: &Ciphertext) -> Ciphertext {
        let mut bytes = payload.as_bytes().to_vec();
        bytes.reverse();
        Ciphertext::from(bytes)
    }

    fn reverse(request: &ComputeRequest) -> Result<ComputeOutput, ComputeError> {
        if request.payload.is_empty() {
            return Err(ComputeError::MalformedInput("empty ciphertext".into()));
        }
        let needed = request.payload.len() as u64;
        if let Some(budget) = request.gas_budget {
            if needed > budget {
                return Err(ComputeError::BudgetExceeded { budget, needed });
            }
        }
        Ok(ComputeOutput {
            result: Self::expected_result(&request.payload),
            gas_used: needed,
        })
    }
}

#[async_trait]
impl ComputeOverCiphertext for MockCompute {
    fn name(&self) -> &str {
        "mock-reverse"
    }

    async fn compute(&self, request: ComputeRequest) -> Result<ComputeOutput, ComputeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.request_id);

        let behavior = self.behavior.lock().clone();
        match behavior {
            MockBehavior::Reverse => Self::reverse(&request),
            MockBehavior::Fail(err) => Err(err),
            MockBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Self::reverse(&request)
            }
        }
    }
}
