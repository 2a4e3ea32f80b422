//! # Event Subscriber
//!
//! The listener side of the bus. A subscriber that falls more than the
//! channel capacity behind loses the oldest entries; it keeps a count of
//! what it missed so it can re-read them from the ledger log.

use crate::events::{BusEvent, EventFilter};
use shared_types::events::LoggedEvent;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// A subscription handle for receiving events.
pub struct Subscription {
    receiver: broadcast::Receiver<BusEvent>,
    filter: EventFilter,
    /// Events skipped because this subscriber lagged.
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BusEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// Returns `None` once every publisher handle is gone. Cancel-safe, so
    /// it can sit in a `tokio::select!` next to a shutdown signal.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => self.record_lag(count),
            }
        }
    }

    /// Receive the next matching ledger log entry, skipping anything else.
    pub async fn recv_ledger(&mut self) -> Option<LoggedEvent> {
        loop {
            if let BusEvent::Ledger(logged) = self.recv().await? {
                return Some(logged);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<BusEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => self.record_lag(count),
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Total events this subscriber missed by lagging.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    fn record_lag(&mut self, count: u64) {
        self.lagged += count;
        warn!(
            lagged = count,
            total = self.lagged,
            "Subscriber lagged; re-read missed entries from the ledger log"
        );
    }
}
