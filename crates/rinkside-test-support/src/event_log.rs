//! In-memory `EventLog` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use rinkside_core::error::{CoreError, codes};
use rinkside_core::event::{AppendOutcome, EventLog, EventRecord};
use uuid::Uuid;

/// An event log held entirely in memory, implementing the full append /
/// idempotency / reversal contract. Useful for exercising the write path
/// without a document store. TTL expiry is the real store's concern;
/// this double keeps everything so fixed-clock tests stay deterministic.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<EventRecord>>,
    appends: Mutex<u64>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, bypassing idempotency accounting.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, record: EventRecord) {
        self.events.lock().unwrap().push(record);
    }

    /// Snapshot of all stored records in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    /// Number of records actually written by `append` (duplicates do not
    /// count). Backs the at-most-once-per-idempotency-key assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn appended_count(&self) -> u64 {
        *self.appends.lock().unwrap()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, record: EventRecord) -> Result<AppendOutcome, CoreError> {
        let mut events = self.events.lock().unwrap();
        if let Some(key) = &record.idempotency_key {
            let existing = events.iter().find(|e| {
                e.tenant_id == record.tenant_id && e.idempotency_key.as_ref() == Some(key)
            });
            if let Some(original) = existing {
                return Ok(AppendOutcome::Duplicate(original.clone()));
            }
        }
        events.push(record.clone());
        *self.appends.lock().unwrap() += 1;
        Ok(AppendOutcome::Appended(record))
    }

    async fn list_by_game(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
    ) -> Result<Vec<EventRecord>, CoreError> {
        let mut matching: Vec<EventRecord> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.game_id == game_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(matching)
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventRecord>, CoreError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.tenant_id == tenant_id && e.game_id == game_id && e.event_id == event_id
            })
            .cloned())
    }

    async fn mark_reversed(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
        event_id: Uuid,
        reversal_event_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut events = self.events.lock().unwrap();
        let target = events.iter_mut().find(|e| {
            e.tenant_id == tenant_id && e.game_id == game_id && e.event_id == event_id
        });
        let Some(target) = target else {
            return Err(CoreError::NotFound {
                resource: "event",
                id: event_id,
            });
        };
        match target.reversed_by {
            Some(existing) if existing == reversal_event_id => Ok(()),
            Some(existing) => Err(CoreError::conflict(
                codes::EVENT_ALREADY_REVERSED,
                format!("event {event_id} already reversed by {existing}"),
            )),
            None => {
                target.reversed_by = Some(reversal_event_id);
                Ok(())
            }
        }
    }
}

/// An event log that always fails with a transient error. Useful for
/// testing the service-unavailable propagation path.
#[derive(Debug, Default)]
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    async fn append(&self, _record: EventRecord) -> Result<AppendOutcome, CoreError> {
        Err(CoreError::ServiceUnavailable("event log unreachable".into()))
    }

    async fn list_by_game(
        &self,
        _tenant_id: Uuid,
        _game_id: Uuid,
    ) -> Result<Vec<EventRecord>, CoreError> {
        Err(CoreError::ServiceUnavailable("event log unreachable".into()))
    }

    async fn find(
        &self,
        _tenant_id: Uuid,
        _game_id: Uuid,
        _event_id: Uuid,
    ) -> Result<Option<EventRecord>, CoreError> {
        Err(CoreError::ServiceUnavailable("event log unreachable".into()))
    }

    async fn mark_reversed(
        &self,
        _tenant_id: Uuid,
        _game_id: Uuid,
        _event_id: Uuid,
        _reversal_event_id: Uuid,
    ) -> Result<(), CoreError> {
        Err(CoreError::ServiceUnavailable("event log unreachable".into()))
    }
}
