//! # Domain Entities
//!
//! The `Request` record and the escrow bookkeeping kept next to it.

use super::errors::LifecycleError;
use super::value_objects::{Operation, RequestStatus};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Ciphertext, RequestId, Timestamp, U256};

/// A gateway request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier, assigned in submission order.
    pub id: RequestId,
    /// Submitting identity; the only one allowed to claim a refund.
    pub requester: Address,
    /// Ledger time of creation.
    pub submit_time: Timestamp,
    /// `submit_time + duration`; refundable from this instant on.
    pub timeout_time: Timestamp,
    /// Current state.
    pub status: RequestStatus,
    /// Encrypted payload, stored verbatim.
    pub payload: Ciphertext,
    /// Encrypted result; empty until a callback succeeds.
    pub result: Ciphertext,
    /// Value escrowed at submission, in wei.
    pub escrowed_value: U256,
    /// Caller-declared off-band cost bound (informational).
    pub gas_budget: Option<u64>,
    /// Gateway-supplied failure reason.
    pub failure_reason: Option<String>,
    /// Time the request entered `Completed`, `Failed` or `Refunded`.
    pub resolved_at: Option<Timestamp>,
}

/// Parameters for creating a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRequest {
    /// Submitting identity.
    pub requester: Address,
    /// Encrypted payload.
    pub payload: Ciphertext,
    /// Escrowed value in wei.
    pub escrowed_value: U256,
    /// Ledger time of creation.
    pub submit_time: Timestamp,
    /// Timeout duration in seconds.
    pub timeout_duration: u64,
    /// Optional declared budget.
    pub gas_budget: Option<u64>,
}

impl NewRequest {
    /// Deadline of the new request.
    ///
    /// Fails with `InvalidInput` if the addition overflows.
    pub fn timeout_time(&self) -> Result<Timestamp, LifecycleError> {
        self.submit_time
            .checked_add(self.timeout_duration)
            .ok_or_else(|| LifecycleError::invalid_input("timeout overflows the ledger clock"))
    }
}

impl Request {
    /// Create a new `Pending` request.
    pub fn new(id: RequestId, params: NewRequest) -> Result<Self, LifecycleError> {
        if params.payload.is_empty() {
            return Err(LifecycleError::invalid_input("payload is empty"));
        }
        if params.timeout_duration == 0 {
            return Err(LifecycleError::invalid_input("timeout duration is zero"));
        }
        let timeout_time = params.timeout_time()?;

        Ok(Self {
            id,
            requester: params.requester,
            submit_time: params.submit_time,
            timeout_time,
            status: RequestStatus::Pending,
            payload: params.payload,
            result: Ciphertext::new(),
            escrowed_value: params.escrowed_value,
            gas_budget: params.gas_budget,
            failure_reason: None,
            resolved_at: None,
        })
    }

    /// Check if the deadline has passed.
    pub fn is_timed_out(&self, now: Timestamp) -> bool {
        now >= self.timeout_time
    }

    /// Check if a refund is allowed: explicit failure, or an unresolved
    /// request past its deadline.
    pub fn is_refundable(&self, now: Timestamp) -> bool {
        match self.status {
            RequestStatus::Failed => true,
            RequestStatus::Pending | RequestStatus::Processing => self.is_timed_out(now),
            RequestStatus::Completed | RequestStatus::Refunded => false,
        }
    }

    /// Error for attempting `operation` in the current state.
    pub fn invalid_state(&self, operation: Operation) -> LifecycleError {
        LifecycleError::InvalidState {
            id: self.id,
            status: self.status,
            operation,
        }
    }

    /// Transition to new state.
    pub fn transition_to(
        &mut self,
        next: RequestStatus,
        operation: Operation,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(self.invalid_state(operation));
        }
        self.status = next;
        if next.is_resolution() {
            self.resolved_at = Some(now);
        }
        Ok(())
    }

    /// Status triple returned by `get_request_status`.
    pub fn status_view(&self) -> RequestStatusView {
        RequestStatusView {
            status: self.status,
            submit_time: self.submit_time,
            timeout_time: self.timeout_time,
        }
    }
}

/// Lightweight status query result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatusView {
    /// Current state.
    pub status: RequestStatus,
    /// Ledger time of creation.
    pub submit_time: Timestamp,
    /// Refund deadline.
    pub timeout_time: Timestamp,
}

/// Running totals of every wei that entered or left escrow.
///
/// `total_escrowed == total_refunded + retained_fees + fees_withdrawn + escrow_held`
/// holds after every committed call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTotals {
    /// Sum of all escrow accepted by `submit`.
    pub total_escrowed: U256,
    /// Sum of all refunds paid to requesters.
    pub total_refunded: U256,
    /// Escrow of completed requests not yet withdrawn.
    pub retained_fees: U256,
    /// Fees already paid out to the owner's chosen recipient.
    pub fees_withdrawn: U256,
    /// Escrow of requests that are still `Pending`, `Processing` or `Failed`.
    pub escrow_held: U256,
}

impl EscrowTotals {
    /// Value the contract account must hold at least.
    pub fn contract_liability(&self) -> U256 {
        self.escrow_held.saturating_add(self.retained_fees)
    }

    /// Escrow accepted by `submit`.
    pub fn record_submit(&mut self, amount: U256) {
        self.total_escrowed = self.total_escrowed.saturating_add(amount);
        self.escrow_held = self.escrow_held.saturating_add(amount);
    }

    /// Escrow of a completed request moves into the fee pool.
    pub fn record_completion(&mut self, amount: U256) {
        self.escrow_held = self.escrow_held.saturating_sub(amount);
        self.retained_fees = self.retained_fees.saturating_add(amount);
    }

    /// Escrow paid back to a requester.
    pub fn record_refund(&mut self, amount: U256) {
        self.escrow_held = self.escrow_held.saturating_sub(amount);
        self.total_refunded = self.total_refunded.saturating_add(amount);
    }

    /// Fee pool paid out.
    pub fn record_withdrawal(&mut self, amount: U256) {
        self.retained_fees = self.retained_fees.saturating_sub(amount);
        self.fees_withdrawn = self.fees_withdrawn.saturating_add(amount);
    }
}
