//! # Domain Errors
//!
//! Every rejection is returned synchronously and leaves no partial effect.

use super::value_objects::{Operation, RequestStatus, Role, ShortAddr};
use serde::{Deserialize, Serialize};
use shared_types::{Address, RequestId};
use thiserror::Error;

/// Request lifecycle error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Malformed argument, rejected before any mutation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown request id.
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    /// Caller does not hold the required role.
    #[error("Unauthorized: {} is not the {role}", ShortAddr(.caller))]
    Unauthorized {
        /// Rejected caller.
        caller: Address,
        /// Role the call required.
        role: Role,
    },

    /// The request is not in a state that permits the operation.
    #[error("Invalid state: cannot {operation} request {id} in state {status}")]
    InvalidState {
        /// Request id.
        id: RequestId,
        /// Current status.
        status: RequestStatus,
        /// Attempted operation.
        operation: Operation,
    },

    /// The retained-fee pool holds nothing to withdraw.
    #[error("Invalid state: retained fee pool is empty")]
    FeePoolEmpty,

    /// A value transfer failed; the whole call was rolled back.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// The request store backend failed.
    #[error("Request store error: {0}")]
    Store(String),
}

/// Coarse classification of a [`LifecycleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`LifecycleError::InvalidInput`].
    InvalidInput,
    /// See [`LifecycleError::NotFound`].
    NotFound,
    /// See [`LifecycleError::Unauthorized`].
    Unauthorized,
    /// See [`LifecycleError::InvalidState`] and [`LifecycleError::FeePoolEmpty`].
    InvalidState,
    /// See [`LifecycleError::TransferFailed`].
    TransferFailed,
    /// See [`LifecycleError::Store`].
    Store,
}

impl ErrorKind {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::InvalidState => "invalid_state",
            Self::TransferFailed => "transfer_failed",
            Self::Store => "store",
        }
    }
}

impl LifecycleError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidState { .. } | Self::FeePoolEmpty => ErrorKind::InvalidState,
            Self::TransferFailed(_) => ErrorKind::TransferFailed,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
