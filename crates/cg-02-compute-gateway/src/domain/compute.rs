//! # Compute Jobs
//!
//! What the gateway hands to a computation adapter and what it gets back.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Ciphertext, Hash, LedgerEvent, RequestId, Timestamp};

/// One unit of off-band work, derived from a `RequestSubmitted` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeRequest {
    /// Ledger request this job answers.
    pub request_id: RequestId,
    /// Submitting identity.
    pub requester: Address,
    /// Encrypted input, exactly as submitted.
    pub payload: Ciphertext,
    /// Declared cost bound, if any.
    pub gas_budget: Option<u64>,
    /// Ledger time after which the requester may reclaim the escrow.
    pub deadline: Timestamp,
}

impl ComputeRequest {
    /// Build a job from a ledger event. `None` for anything but a submission.
    pub fn from_event(event: &LedgerEvent) -> Option<Self> {
        match event {
            LedgerEvent::RequestSubmitted {
                id,
                requester,
                timeout_time,
                gas_budget,
                payload,
                ..
            } => Some(Self {
                request_id: *id,
                requester: *requester,
                payload: payload.clone(),
                gas_budget: *gas_budget,
                deadline: *timeout_time,
            }),
            _ => None,
        }
    }
}

/// Result of a successful computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeOutput {
    /// Encrypted result to deliver through `callback`.
    pub result: Ciphertext,
    /// Cost units the adapter consumed.
    pub gas_used: u64,
}

impl ComputeOutput {
    /// Output with no cost accounting.
    pub fn new(result: Ciphertext) -> Self {
        Self {
            result,
            gas_used: 0,
        }
    }

    /// SHA-256 of the result ciphertext, for logs.
    pub fn result_digest(&self) -> Hash {
        self.result.digest()
    }
}

/// How one submission was resolved by the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Result delivered.
    Completed,
    /// Adapter error reported as a failure.
    Failed,
    /// Adapter overran its time limit; reported as a failure.
    TimedOut,
    /// The ledger refused an acknowledge, callback or failure report.
    Rejected,
}

impl Outcome {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timeout",
            Self::Rejected => "rejected",
        }
    }
}

/// Per-worker counters, returned when the worker stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Submissions taken off the bus.
    pub processed: u64,
    /// Results delivered.
    pub completed: u64,
    /// Failures reported for adapter errors.
    pub failed: u64,
    /// Failures reported for adapter timeouts.
    pub timed_out: u64,
    /// Calls the ledger refused.
    pub rejected: u64,
}

impl WorkerStats {
    /// Count one resolved submission.
    pub fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Completed => self.completed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::TimedOut => self.timed_out += 1,
            Outcome::Rejected => self.rejected += 1,
        }
    }
}
