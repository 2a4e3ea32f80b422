//! # Event Publisher
//!
//! The ledger side of the bus. The lifecycle engine publishes from inside a
//! committing call, so publishing never blocks and never fails: with no
//! listener attached the event is simply not delivered, and the ledger log
//! remains the record.

use crate::events::{BusEvent, EventFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::events::LoggedEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Sentinel for "no ledger entry published yet".
const NO_SEQUENCE: u64 = u64::MAX;

/// Trait for publishing events to the bus.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    fn publish(&self, event: BusEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;

    /// Publish a committed ledger log entry.
    fn publish_ledger(&self, logged: LoggedEvent) -> usize {
        self.publish(BusEvent::Ledger(logged))
    }
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Tracks the ledger sequence of what it forwards so a publisher that skips
/// or repeats log entries shows up in the logs.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<BusEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Sequence of the last ledger entry forwarded.
    last_sequence: AtomicU64,

    /// Ledger entries whose sequence did not follow the previous one.
    sequence_breaks: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            last_sequence: AtomicU64::new(NO_SEQUENCE),
            sequence_breaks: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence of the last ledger entry forwarded, if any.
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::Acquire) {
            NO_SEQUENCE => None,
            seq => Some(seq),
        }
    }

    /// How many ledger entries arrived out of log order.
    #[must_use]
    pub fn sequence_breaks(&self) -> u64 {
        self.sequence_breaks.load(Ordering::Relaxed)
    }

    fn track_sequence(&self, sequence: u64) {
        let previous = self.last_sequence.swap(sequence, Ordering::AcqRel);
        let expected = previous.wrapping_add(1);
        if previous != NO_SEQUENCE && sequence != expected {
            self.sequence_breaks.fetch_add(1, Ordering::Relaxed);
            warn!(
                expected,
                got = sequence,
                "Ledger entry published out of log order"
            );
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        if let Some(logged) = event.as_ledger() {
            self.track_sequence(logged.sequence);
        }
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(topic = ?topic, receivers = receiver_count, "Event published");
                receiver_count
            }
            Err(_) => {
                trace!(topic = ?topic, "Event published with no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
