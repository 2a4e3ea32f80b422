//! # Domain Invariants
//!
//! Business rules checked by the engine after every commit and by tests.

use super::entities::{EscrowTotals, Request};
use super::value_objects::RequestStatus;
use shared_types::U256;

/// Invariant: result presence.
///
/// `result` is non-empty if and only if the request is `Completed`.
pub fn invariant_result_matches_status(request: &Request) -> bool {
    (request.status == RequestStatus::Completed) == !request.result.is_empty()
}

/// Invariant: resolution time.
///
/// Only requests that left `Pending`/`Processing` carry `resolved_at`.
pub fn invariant_resolution_recorded(request: &Request) -> bool {
    request.status.is_resolution() == request.resolved_at.is_some()
}

/// Invariant: value conservation.
///
/// Every wei that entered escrow is refunded, retained, withdrawn or
/// still held.
pub fn invariant_conservation(totals: &EscrowTotals) -> bool {
    let accounted = totals
        .total_refunded
        .checked_add(totals.retained_fees)
        .and_then(|v| v.checked_add(totals.fees_withdrawn))
        .and_then(|v| v.checked_add(totals.escrow_held));
    accounted == Some(totals.total_escrowed)
}

/// Invariant: solvency.
///
/// The contract account covers every unresolved escrow and the fee pool.
pub fn invariant_contract_solvent(totals: &EscrowTotals, contract_balance: U256) -> bool {
    contract_balance >= totals.contract_liability()
}
