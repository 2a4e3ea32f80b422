//! # Domain Value Objects
//!
//! Immutable value types for the request lifecycle.

use serde::{Deserialize, Serialize};
use shared_types::{short_addr, Address, U256};
use std::fmt;

/// Request lifecycle state machine.
///
/// ```text
///            acknowledge
///   Pending ────────────▶ Processing
///      │                      │
///      ├── callback ──────────┼──────▶ Completed
///      └── report_failure ────┴──────▶ Failed
///
///   Pending | Processing | Failed ── refund ──▶ Refunded
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Submitted, escrow held, not yet picked up.
    #[default]
    Pending,
    /// Acknowledged by the gateway.
    Processing,
    /// Result delivered. Terminal.
    Completed,
    /// Gateway reported failure; refundable immediately.
    Failed,
    /// Escrow returned to the requester. Terminal.
    Refunded,
}

impl RequestStatus {
    /// Check if the transition is part of the legal graph.
    ///
    /// Time guards (timeout for refunds) are not part of the graph and are
    /// checked by [`crate::domain::Request::is_refundable`].
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing) => true,
            (Self::Pending | Self::Processing, Self::Completed) => true,
            (Self::Pending | Self::Processing, Self::Failed) => true,
            (Self::Pending | Self::Processing | Self::Failed, Self::Refunded) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded)
    }

    /// Whether the gateway may still act on the request.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether the escrow is still held against this request.
    pub fn holds_escrow(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing | Self::Failed)
    }

    /// States that record a resolution time when entered.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Refunded)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Sender and attached value of one ledger transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Transaction sender.
    pub caller: Address,
    /// Native value attached to the call, in wei.
    pub value: U256,
}

impl CallContext {
    /// A call from `caller` with no value attached.
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: U256::zero(),
        }
    }

    /// Attach value to the call.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Identity a call was required to come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Contract owner.
    Owner,
    /// Currently configured gateway.
    Gateway,
    /// Original submitter of the request.
    Requester,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Public entry points, used to label errors and log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `submit`
    Submit,
    /// `acknowledge`
    Acknowledge,
    /// `callback`
    Callback,
    /// `report_failure`
    ReportFailure,
    /// `request_refund`
    RequestRefund,
    /// `admin_force_refund`
    AdminForceRefund,
    /// `set_gateway_address`
    SetGatewayAddress,
    /// `set_default_timeout`
    SetDefaultTimeout,
    /// `transfer_ownership`
    TransferOwnership,
    /// `withdraw_fees`
    WithdrawFees,
}

impl Operation {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Acknowledge => "acknowledge",
            Self::Callback => "callback",
            Self::ReportFailure => "report_failure",
            Self::RequestRefund => "request_refund",
            Self::AdminForceRefund => "admin_force_refund",
            Self::SetGatewayAddress => "set_gateway_address",
            Self::SetDefaultTimeout => "set_default_timeout",
            Self::TransferOwnership => "transfer_ownership",
            Self::WithdrawFees => "withdraw_fees",
        }
    }

    /// Whether the entry point accepts attached value.
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::Submit)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display wrapper printing an address as a short hex prefix.
pub(crate) struct ShortAddr<'a>(pub &'a Address);

impl fmt::Display for ShortAddr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_addr(self.0))
    }
}
