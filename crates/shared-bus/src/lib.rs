//! # Shared Bus - Ledger Event Fan-Out
//!
//! Carries committed ledger events from the request lifecycle core to
//! off-band listeners (the compute gateway, monitoring).
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │ Lifecycle Engine │                    │ Compute Gateway  │
//! │  (cg-01)         │    publish()       │  (cg-02)         │
//! │                  │ ──────┐            │                  │
//! └──────────────────┘       │            └──────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │ ─────────┘
//!                      └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery Semantics
//!
//! - Events are published only after the emitting transaction committed.
//! - Per-subscriber order equals ledger log order.
//! - A lagging subscriber skips events; the ledger log stays authoritative.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{BusEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
