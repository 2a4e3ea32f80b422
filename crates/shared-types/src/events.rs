//! # Ledger Events
//!
//! Entries of the contract's append-only event log. `RequestSubmitted` is
//! the only notification channel the off-band gateway has.

use crate::entities::{Address, Ciphertext, RequestId, Timestamp, U256};
use serde::{Deserialize, Serialize};

/// An event emitted by a committed ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // REQUEST LIFECYCLE
    // =========================================================================
    /// A request was created and its value escrowed.
    RequestSubmitted {
        /// New request id.
        id: RequestId,
        /// Submitting identity.
        requester: Address,
        /// Escrowed value in wei.
        escrowed_value: U256,
        /// Deadline after which the request becomes refundable.
        timeout_time: Timestamp,
        /// Caller-declared off-band cost bound.
        gas_budget: Option<u64>,
        /// Encrypted payload, published so the gateway can pick it up.
        payload: Ciphertext,
    },

    /// The gateway acknowledged receipt (Pending → Processing).
    RequestAcknowledged {
        /// Request id.
        id: RequestId,
    },

    /// The gateway delivered a result (→ Completed).
    RequestCompleted {
        /// Request id.
        id: RequestId,
        /// Encrypted result.
        result: Ciphertext,
    },

    /// The gateway signalled an explicit failure (→ Failed).
    RequestFailed {
        /// Request id.
        id: RequestId,
        /// Gateway-supplied reason.
        reason: String,
    },

    /// Escrow was returned to the requester (→ Refunded).
    RefundProcessed {
        /// Request id.
        id: RequestId,
        /// Recipient of the refund.
        requester: Address,
        /// Amount paid out in wei.
        amount: U256,
        /// True when triggered by the owner's force-refund capability.
        forced: bool,
    },

    // =========================================================================
    // ADMINISTRATION (audit trail)
    // =========================================================================
    /// The gateway identity was rotated.
    GatewayAddressUpdated {
        /// Previous gateway.
        previous: Address,
        /// New gateway.
        new_gateway: Address,
    },

    /// The contract-wide default timeout changed.
    TimeoutUpdated {
        /// Previous duration in seconds.
        previous: u64,
        /// New duration in seconds.
        new_duration: u64,
    },

    /// Ownership moved to a new identity.
    OwnershipTransferred {
        /// Previous owner.
        previous: Address,
        /// New owner.
        new_owner: Address,
    },

    /// Retained completion fees were paid out by the owner.
    FeesWithdrawn {
        /// Recipient.
        to: Address,
        /// Amount in wei.
        amount: U256,
    },
}

impl LedgerEvent {
    /// The request this event refers to, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::RequestSubmitted { id, .. }
            | Self::RequestAcknowledged { id }
            | Self::RequestCompleted { id, .. }
            | Self::RequestFailed { id, .. }
            | Self::RefundProcessed { id, .. } => Some(*id),
            Self::GatewayAddressUpdated { .. }
            | Self::TimeoutUpdated { .. }
            | Self::OwnershipTransferred { .. }
            | Self::FeesWithdrawn { .. } => None,
        }
    }

    /// Stable event name, used as a metric/log label.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestSubmitted { .. } => "RequestSubmitted",
            Self::RequestAcknowledged { .. } => "RequestAcknowledged",
            Self::RequestCompleted { .. } => "RequestCompleted",
            Self::RequestFailed { .. } => "RequestFailed",
            Self::RefundProcessed { .. } => "RefundProcessed",
            Self::GatewayAddressUpdated { .. } => "GatewayAddressUpdated",
            Self::TimeoutUpdated { .. } => "TimeoutUpdated",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::FeesWithdrawn { .. } => "FeesWithdrawn",
        }
    }

    /// True for owner-triggered configuration events.
    #[must_use]
    pub fn is_administrative(&self) -> bool {
        self.request_id().is_none()
    }
}

/// A ledger event together with its position in the global log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Position in the append-only log (0-based, gap-free).
    pub sequence: u64,
    /// Ledger time of the emitting transaction.
    pub timestamp: Timestamp,
    /// The event itself.
    pub event: LedgerEvent,
}
