//! # Integration Tests
//!
//! Cross-crate tests over the wired contract in [`crate::fixtures`].

pub mod concurrency;
pub mod properties;
pub mod scenarios;
