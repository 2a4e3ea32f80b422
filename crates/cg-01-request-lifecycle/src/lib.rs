//! # CG-01 Request Lifecycle
//!
//! Escrowed confidential-compute requests: submit, gateway callback,
//! failure report and timeout refund.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A requester locks value together with an encrypted payload. The trusted
//! gateway computes off-ledger and either delivers an encrypted result
//! (the escrow becomes a fee) or reports a failure. If nothing arrives
//! before the deadline, the requester reclaims the escrow.
//!
//! ## Lifecycle
//!
//! ```text
//!              acknowledge
//!   Pending ───────────────► Processing
//!      │ │                     │   │
//!      │ └──── callback ───────┼───┴──► Completed
//!      │                       │
//!      └──── report_failure ───┴──────► Failed ──► Refunded
//! ```
//!
//! `Pending` and `Processing` requests may also be refunded directly once
//! `now >= timeout_time`.
//!
//! ## Safety Properties
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | One resolution per request | `RequestStatus::can_transition_to` |
//! | Escrow paid out at most once | status staged before any transfer |
//! | Atomic calls | re-entrant executor lock, rollback on transfer failure |
//! | Conservation | `EscrowTotals` checked after every commit |
//! | Gateway-only callbacks | `AccessPolicy::ensure_gateway` |
//!
//! ## Module Structure
//!
//! ```text
//! cg-01-request-lifecycle/
//! ├── domain/          # Request, RequestStatus, AccessPolicy, config, errors
//! ├── ports/           # GatewayRequestApi, GatewayAdminApi, store/clock/ledger/sink
//! ├── adapters/        # In-memory store, ledger and event log; bus sink
//! └── service.rs       # LifecycleEngine
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{BusEventSink, InMemoryEventLog, InMemoryLedger, InMemoryRequestStore};
pub use domain::{
    invariant_conservation, invariant_contract_solvent, invariant_resolution_recorded,
    invariant_result_matches_status, AccessPolicy, CallContext, ConfigError, ErrorKind,
    EscrowTotals, LifecycleConfig, LifecycleError, NewRequest, Operation, Request, RequestStatus,
    RequestStatusView, Role, DEFAULT_TIMEOUT_SECS, MAX_PAYLOAD_BYTES, MAX_REASON_BYTES,
    MAX_TIMEOUT_SECS,
};
pub use ports::{
    EventSink, GatewayAdminApi, GatewayRequestApi, LedgerClock, ManualClock, RequestStore,
    SystemClock, TransferError, ValueTransfer,
};
pub use service::{InMemoryEngine, LedgerPorts, LifecycleEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
