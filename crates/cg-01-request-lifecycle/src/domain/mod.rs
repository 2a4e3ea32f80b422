//! # Domain Module
//!
//! Core domain types for the request lifecycle. Pure logic, no I/O.

pub mod access;
pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;

pub use access::AccessPolicy;
pub use config::{
    ConfigError, LifecycleConfig, DEFAULT_TIMEOUT_SECS, MAX_PAYLOAD_BYTES, MAX_REASON_BYTES,
    MAX_TIMEOUT_SECS,
};
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
