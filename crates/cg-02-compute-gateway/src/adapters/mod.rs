//! # Adapters

pub mod mock_compute;

pub use mock_compute::{MockBehavior, MockCompute};
