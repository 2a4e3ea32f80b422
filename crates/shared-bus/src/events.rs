//! # Bus Events
//!
//! Everything that flows through the shared bus: committed ledger events
//! plus out-of-band critical errors raised by listeners.

use serde::{Deserialize, Serialize};
use shared_types::events::{LedgerEvent, LoggedEvent};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BusEvent {
    /// A committed entry of the ledger event log.
    Ledger(LoggedEvent),

    /// Critical error requiring operator attention.
    CriticalError {
        /// Component tag that raised the error (e.g. "cg-02").
        source: String,
        /// Error description.
        error: String,
    },
}

impl BusEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Ledger(logged) => match &logged.event {
                LedgerEvent::RequestSubmitted { .. } => EventTopic::Submissions,
                LedgerEvent::RequestAcknowledged { .. }
                | LedgerEvent::RequestCompleted { .. }
                | LedgerEvent::RequestFailed { .. } => EventTopic::Processing,
                LedgerEvent::RefundProcessed { .. } => EventTopic::Refunds,
                LedgerEvent::GatewayAddressUpdated { .. }
                | LedgerEvent::TimeoutUpdated { .. }
                | LedgerEvent::OwnershipTransferred { .. }
                | LedgerEvent::FeesWithdrawn { .. } => EventTopic::Administration,
            },
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// The ledger log entry, if this is a ledger event.
    #[must_use]
    pub fn as_ledger(&self) -> Option<&LoggedEvent> {
        match self {
            Self::Ledger(logged) => Some(logged),
            Self::CriticalError { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// `RequestSubmitted`, the gateway work queue.
    Submissions,
    /// Acknowledgements, completions and failures.
    Processing,
    /// Refund payouts.
    Refunds,
    /// Owner-triggered configuration changes.
    Administration,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BusEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
