//! Loading and committing inventory record streams.
//!
//! ```text
//! load stream → rehydrate → decide (pure) → append with ExpectedVersion::Exact
//! ```
//!
//! A writer that loaded a stale revision gets a concurrency error from the
//! store and must reload before deciding again.

use uuid::Uuid;

use stockroom_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion};
use stockroom_inventory::{InventoryCommand, InventoryEvent, InventoryId, InventoryRecord};

use crate::error::ServiceError;
use crate::event_store::{EventStore, StoredEvent, StreamAppend, UncommittedEvent};

/// Aggregate type tag of inventory record streams.
pub const RECORD_AGGREGATE_TYPE: &str = "inventory.record";

/// Decided events for one record, to be appended at `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    pub record_id: InventoryId,
    pub expected_version: u64,
    pub events: Vec<InventoryEvent>,
}

impl RecordWrite {
    /// Events decided against `record` as loaded.
    pub fn against(record: &InventoryRecord, events: Vec<InventoryEvent>) -> Self {
        Self {
            record_id: record.id_typed(),
            expected_version: record.version(),
            events,
        }
    }
}

/// Event-sourced repository for inventory records.
#[derive(Debug)]
pub struct RecordRepository<S> {
    store: S,
}

impl<S> RecordRepository<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rehydrate a record from its stream. A missing stream yields an empty,
    /// not-yet-created record.
    pub fn load(&self, record_id: InventoryId) -> Result<InventoryRecord, ServiceError> {
        let history = self.store.load_stream(record_id.0)?;
        validate_loaded_stream(record_id, &history)?;

        let mut record = InventoryRecord::empty(record_id);
        apply_history(&mut record, &history)?;
        Ok(record)
    }

    /// Like [`load`](Self::load), but the record must exist and not be deleted.
    pub fn load_existing(&self, record_id: InventoryId) -> Result<InventoryRecord, ServiceError> {
        let record = self.load(record_id)?;
        if !record.exists() {
            return Err(DomainError::not_found(format!("inventory record {record_id}")).into());
        }
        Ok(record)
    }

    /// Load, decide, append. Returns the evolved record and the committed events.
    pub fn dispatch(
        &self,
        record_id: InventoryId,
        command: &InventoryCommand,
    ) -> Result<(InventoryRecord, Vec<InventoryEvent>), ServiceError> {
        let mut record = self.load(record_id)?;
        let decided = record.handle(command)?;
        self.commit(vec![RecordWrite::against(&record, decided.clone())])?;
        for ev in &decided {
            record.apply(ev);
        }
        Ok((record, decided))
    }

    /// Append one or more record writes atomically.
    pub fn commit(&self, writes: Vec<RecordWrite>) -> Result<Vec<StoredEvent>, ServiceError> {
        let appends = writes
            .into_iter()
            .filter(|w| !w.events.is_empty())
            .map(|w| -> Result<StreamAppend, ServiceError> {
                let aggregate_id = w.record_id.0;
                let events = w
                    .events
                    .iter()
                    .map(|ev| {
                        UncommittedEvent::from_typed(
                            aggregate_id,
                            RECORD_AGGREGATE_TYPE,
                            Uuid::now_v7(),
                            ev,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StreamAppend::new(
                    aggregate_id,
                    ExpectedVersion::Exact(w.expected_version),
                    events,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if appends.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.store.append_batch(appends)?)
    }
}

fn validate_loaded_stream(record_id: InventoryId, stream: &[StoredEvent]) -> Result<(), ServiceError> {
    // Ensure the stream belongs to this record and is gapless and ordered.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != record_id.0 {
            return Err(ServiceError::CorruptStream(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.aggregate_type != RECORD_AGGREGATE_TYPE {
            return Err(ServiceError::CorruptStream(format!(
                "loaded stream contains aggregate_type `{}` at index {idx}",
                e.aggregate_type
            )));
        }
        if e.sequence_number != last + 1 {
            return Err(ServiceError::CorruptStream(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history(record: &mut InventoryRecord, history: &[StoredEvent]) -> Result<(), ServiceError> {
    for stored in history {
        let ev: InventoryEvent = serde_json::from_value(stored.payload.clone())
            .map_err(|e| ServiceError::Deserialize(e.to_string()))?;
        record.apply(&ev);
    }
    Ok(())
}
