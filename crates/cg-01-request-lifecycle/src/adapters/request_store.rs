//! In-memory Request Store
//!
//! Implements the `RequestStore` port. Ids are dense from 0, so the record
//! for id `n` sits at index `n`.
//!
//! While a savepoint is open every mutation journals the record it
//! replaced, so a rollback can put the vector back exactly as it was.

use crate::domain::{LifecycleError, NewRequest, Operation, Request, RequestStatus};
use crate::ports::outbound::RequestStore;
use shared_types::{Ciphertext, RequestId, Timestamp};

/// Request records held in a vector.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRequestStore {
    records: Vec<Request>,
    /// Refuse `create` beyond this many records.
    capacity_limit: Option<usize>,
    /// Undo journal, newest last.
    journal: Vec<Undo>,
    /// Journal length at each open savepoint.
    savepoints: Vec<usize>,
}

#[derive(Debug, Clone)]
enum Undo {
    /// A record was appended.
    Created,
    /// A record was overwritten; holds the previous copy.
    Replaced(Request),
}

impl InMemoryRequestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses to grow past `limit` records.
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            capacity_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Iterate over all records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.records.iter()
    }

    /// Mutable access to a record, journaling its current copy first.
    fn record_mut(&mut self, id: RequestId) -> Result<&mut Request, LifecycleError> {
        let record = usize::try_from(id)
            .ok()
            .and_then(|idx| self.records.get_mut(idx))
            .ok_or(LifecycleError::NotFound(id))?;
        if !self.savepoints.is_empty() {
            self.journal.push(Undo::Replaced(record.clone()));
        }
        Ok(record)
    }

    fn undo(&mut self, entry: Undo) -> Result<(), LifecycleError> {
        match entry {
            Undo::Created => {
                self.records.pop();
            }
            Undo::Replaced(previous) => {
                let id = previous.id;
                let slot = usize::try_from(id)
                    .ok()
                    .and_then(|idx| self.records.get_mut(idx))
                    .ok_or(LifecycleError::NotFound(id))?;
                *slot = previous;
            }
        }
        Ok(())
    }
}

impl RequestStore for InMemoryRequestStore {
    fn create(&mut self, params: NewRequest) -> Result<RequestId, LifecycleError> {
        if self
            .capacity_limit
            .is_some_and(|limit| self.records.len() >= limit)
        {
            return Err(LifecycleError::Store("request store is full".into()));
        }

        let id = self.next_id();
        let request = Request::new(id, params)?;
        self.records.push(request);
        if !self.savepoints.is_empty() {
            self.journal.push(Undo::Created);
        }
        Ok(id)
    }

    fn get(&self, id: RequestId) -> Result<Request, LifecycleError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.records.get(idx))
            .cloned()
            .ok_or(LifecycleError::NotFound(id))
    }

    fn set_status(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        operation: Operation,
        at: Timestamp,
    ) -> Result<(), LifecycleError> {
        self.record_mut(id)?.transition_to(status, operation, at)
    }

    fn set_result(&mut self, id: RequestId, result: Ciphertext) -> Result<(), LifecycleError> {
        self.record_mut(id)?.result = result;
        Ok(())
    }

    fn set_failure_reason(
        &mut self,
        id: RequestId,
        reason: String,
    ) -> Result<(), LifecycleError> {
        self.record_mut(id)?.failure_reason = Some(reason);
        Ok(())
    }

    fn begin_savepoint(&mut self) {
        self.savepoints.push(self.journal.len());
    }

    fn release_savepoint(&mut self) {
        self.savepoints.pop();
        if self.savepoints.is_empty() {
            self.journal.clear();
        }
    }

    fn rollback_savepoint(&mut self) -> Result<(), LifecycleError> {
        let mark = self
            .savepoints
            .pop()
            .ok_or_else(|| LifecycleError::Store("no open savepoint".into()))?;
        while self.journal.len() > mark {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry)?;
            }
        }
        Ok(())
    }

    fn next_id(&self) -> RequestId {
        self.records.len() as RequestId
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
