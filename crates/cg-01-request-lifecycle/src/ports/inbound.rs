//! # Inbound Ports
//!
//! What the request lifecycle subsystem can do. Every mutating call takes
//! the sender and attached value of its ledger transaction.

use crate::domain::{CallContext, EscrowTotals, LifecycleError, Request, RequestStatusView};
use shared_types::{Address, Ciphertext, RequestId, U256};

/// Client and gateway entry points.
pub trait GatewayRequestApi: Send + Sync {
    /// Create a request and escrow the attached value.
    ///
    /// `timeout` of `None` uses the contract default.
    fn submit(
        &self,
        ctx: CallContext,
        payload: Ciphertext,
        gas_budget: Option<u64>,
        timeout: Option<u64>,
    ) -> Result<RequestId, LifecycleError>;

    /// Gateway only: `Pending` → `Processing`.
    fn acknowledge(&self, ctx: CallContext, id: RequestId) -> Result<(), LifecycleError>;

    /// Gateway only: deliver the result (→ `Completed`).
    fn callback(
        &self,
        ctx: CallContext,
        id: RequestId,
        result: Ciphertext,
    ) -> Result<(), LifecycleError>;

    /// Gateway only: signal an explicit failure (→ `Failed`).
    fn report_failure(
        &self,
        ctx: CallContext,
        id: RequestId,
        reason: String,
    ) -> Result<(), LifecycleError>;

    /// Requester only: reclaim the escrow of a failed or timed-out request.
    ///
    /// Returns the amount paid out.
    fn request_refund(&self, ctx: CallContext, id: RequestId) -> Result<U256, LifecycleError>;

    /// Whether the request's deadline has passed.
    fn is_timed_out(&self, id: RequestId) -> Result<bool, LifecycleError>;

    /// Status, submit time and deadline.
    fn get_request_status(&self, id: RequestId) -> Result<RequestStatusView, LifecycleError>;

    /// The full record.
    fn get_request_history(&self, id: RequestId) -> Result<Request, LifecycleError>;

    /// Currently configured gateway.
    fn gateway(&self) -> Address;
}

/// Owner entry points and contract-wide queries.
pub trait GatewayAdminApi: Send + Sync {
    /// Rotate the gateway identity.
    fn set_gateway_address(
        &self,
        ctx: CallContext,
        new_gateway: Address,
    ) -> Result<(), LifecycleError>;

    /// Change the default timeout for future submissions.
    fn set_default_timeout(&self, ctx: CallContext, duration: u64) -> Result<(), LifecycleError>;

    /// Hand ownership to a new identity.
    fn transfer_ownership(&self, ctx: CallContext, new_owner: Address)
        -> Result<(), LifecycleError>;

    /// Pay the retained-fee pool to `to`. Returns the amount.
    fn withdraw_fees(&self, ctx: CallContext, to: Address) -> Result<U256, LifecycleError>;

    /// Refund a refundable request to its requester on the owner's behalf.
    ///
    /// Disabled unless configuration enables it.
    fn admin_force_refund(&self, ctx: CallContext, id: RequestId) -> Result<U256, LifecycleError>;

    /// Current owner.
    fn owner(&self) -> Address;

    /// Default timeout in seconds.
    fn default_timeout(&self) -> u64;

    /// Escrow retained from completed requests, not yet withdrawn.
    fn retained_fees(&self) -> U256;

    /// Escrow of unresolved requests.
    fn escrow_held(&self) -> U256;

    /// The id the next submission will receive.
    fn next_request_id(&self) -> RequestId;

    /// Running escrow totals.
    fn escrow_totals(&self) -> EscrowTotals;
}
