//! # Ports
//!
//! The gateway depends on the ledger through `GatewayRequestApi` and on a
//! computation program through [`ComputeOverCiphertext`].

pub mod outbound;

pub use outbound::ComputeOverCiphertext;
