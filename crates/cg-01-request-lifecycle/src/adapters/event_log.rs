//! Event Log Adapters
//!
//! `InMemoryEventLog` is the authoritative append-only log. `BusEventSink`
//! wraps any log and fans committed entries out over the shared bus.

use crate::ports::outbound::EventSink;
use parking_lot::RwLock;
use shared_bus::EventPublisher;
use shared_types::{LedgerEvent, LoggedEvent, RequestId, Timestamp};
use std::sync::Arc;
use tracing::trace;

/// Append-only event log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    entries: RwLock<Vec<LoggedEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry.
    pub fn entries(&self) -> Vec<LoggedEvent> {
        self.entries.read().clone()
    }

    /// Bare events, in order.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.entries.read().iter().map(|e| e.event.clone()).collect()
    }

    /// Events that refer to request `id`.
    pub fn events_for(&self, id: RequestId) -> Vec<LedgerEvent> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.event.request_id() == Some(id))
            .map(|e| e.event.clone())
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl EventSink for InMemoryEventLog {
    fn append(&self, timestamp: Timestamp, events: Vec<LedgerEvent>) -> Vec<LoggedEvent> {
        let mut entries = self.entries.write();
        let first = entries.len() as u64;
        let logged: Vec<LoggedEvent> = events
            .into_iter()
            .enumerate()
            .map(|(offset, event)| LoggedEvent {
                sequence: first + offset as u64,
                timestamp,
                event,
            })
            .collect();
        entries.extend(logged.iter().cloned());
        logged
    }
}

/// Publishes every committed entry of an inner log onto the event bus.
pub struct BusEventSink<L: EventSink> {
    log: Arc<L>,
    bus: Arc<dyn EventPublisher>,
}

impl<L: EventSink> BusEventSink<L> {
    /// Wrap `log`, publishing to `bus`.
    pub fn new(log: Arc<L>, bus: Arc<dyn EventPublisher>) -> Self {
        Self { log, bus }
    }

    /// The wrapped log.
    pub fn log(&self) -> &Arc<L> {
        &self.log
    }
}

impl<L: EventSink> EventSink for BusEventSink<L> {
    fn append(&self, timestamp: Timestamp, events: Vec<LedgerEvent>) -> Vec<LoggedEvent> {
        let logged = self.log.append(timestamp, events);
        for entry in &logged {
            let receivers = self.bus.publish_ledger(entry.clone());
            trace!(
                sequence = entry.sequence,
                event = entry.event.name(),
                receivers,
                "[cg-01] Ledger event published"
            );
        }
        logged
    }
}
