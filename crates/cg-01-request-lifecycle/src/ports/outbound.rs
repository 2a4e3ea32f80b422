//! # Outbound Ports
//!
//! Host-ledger primitives the engine depends on: request storage, the
//! block clock, native value transfer and the append-only event log.

use crate::domain::{LifecycleError, NewRequest, Operation, Request, RequestStatus};
use shared_types::{Address, Ciphertext, LedgerEvent, LoggedEvent, RequestId, Timestamp, U256};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// =============================================================================
// REQUEST STORE
// =============================================================================

/// Addressable storage of request records.
///
/// Performs no authorization or payment logic. Mutators are invoked only by
/// the lifecycle engine; `set_status` still refuses moves the status graph
/// forbids.
pub trait RequestStore: Send {
    /// Allocate the next id and store a new `Pending` record.
    ///
    /// Fails with `InvalidInput` for an empty payload or zero duration; no
    /// id is consumed in that case.
    fn create(&mut self, params: NewRequest) -> Result<RequestId, LifecycleError>;

    /// Fetch a copy of a record.
    fn get(&self, id: RequestId) -> Result<Request, LifecycleError>;

    /// Move a record to a new status on behalf of `operation`.
    ///
    /// Fails with `InvalidState` when the status graph forbids the move.
    /// Entering a resolution state stamps `resolved_at`.
    fn set_status(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        operation: Operation,
        at: Timestamp,
    ) -> Result<(), LifecycleError>;

    /// Store the callback result.
    fn set_result(&mut self, id: RequestId, result: Ciphertext) -> Result<(), LifecycleError>;

    /// Store the gateway's failure reason.
    fn set_failure_reason(&mut self, id: RequestId, reason: String)
        -> Result<(), LifecycleError>;

    /// Open a savepoint. Savepoints nest.
    fn begin_savepoint(&mut self);

    /// Close the latest savepoint and keep its writes. Inside an outer
    /// savepoint they remain undoable by that one.
    fn release_savepoint(&mut self);

    /// Undo every write since the latest savepoint, then close it. Records
    /// created since then are dropped and their ids freed.
    fn rollback_savepoint(&mut self) -> Result<(), LifecycleError>;

    /// The id the next `create` would allocate.
    fn next_id(&self) -> RequestId;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Monotonic ledger clock (block timestamp).
pub trait LedgerClock: Send + Sync {
    /// Current timestamp in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LedgerClock for SystemClock {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Clock driven by hand, for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    time: AtomicU64,
}

impl ManualClock {
    /// Start at `initial`.
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    /// Move time forward.
    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `time`. Never moves backwards.
    pub fn set(&self, time: Timestamp) {
        self.time.fetch_max(time, Ordering::SeqCst);
    }
}

impl LedgerClock for ManualClock {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

// =============================================================================
// VALUE TRANSFER
// =============================================================================

/// Value transfer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The paying account does not hold enough.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance {
        /// Requested amount.
        needed: U256,
        /// Balance of the paying account.
        available: U256,
    },

    /// The recipient refused the transfer.
    #[error("recipient rejected transfer: {0}")]
    Rejected(String),
}

/// Native value movement between accounts and the contract account.
pub trait ValueTransfer: Send + Sync {
    /// Pull `amount` from `from` into the contract account.
    fn receive(&self, from: &Address, amount: U256) -> Result<(), TransferError>;

    /// Pay `amount` from the contract account to `to`.
    ///
    /// The recipient may run code during the transfer, including calls back
    /// into the engine.
    fn send(&self, to: &Address, amount: U256) -> Result<(), TransferError>;

    /// Balance of the contract account.
    fn contract_balance(&self) -> U256;
}

// =============================================================================
// EVENT LOG
// =============================================================================

/// Append-only ledger event log.
pub trait EventSink: Send + Sync {
    /// Append the events of one committed call, in order.
    ///
    /// The log assigns consecutive sequence numbers and returns the entries.
    fn append(&self, timestamp: Timestamp, events: Vec<LedgerEvent>) -> Vec<LoggedEvent>;
}
