//! # Adapters
//!
//! In-memory implementations of the outbound ports, plus the bus-backed
//! event sink.

pub mod event_log;
pub mod ledger;
pub mod request_store;

pub use event_log::{BusEventSink, InMemoryEventLog};
pub use ledger::{InMemoryLedger, RecipientHook};
pub use request_store::InMemoryRequestStore;
