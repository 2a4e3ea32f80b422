//! # Shared Types Crate
//!
//! Identities, amounts, opaque ciphertext and the ledger event log entries
//! used by every Cipher-Gateway crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Cross-crate types are defined here once.
//! - **Opaque Payloads**: `Ciphertext` is never parsed by the core; it only
//!   supports length, emptiness and a digest for log correlation.
//! - **Append-Only Log**: `LoggedEvent` carries the sequence number assigned
//!   by the ledger event log at commit time.

pub mod entities;
pub mod events;

pub use entities::*;
pub use events::*;
