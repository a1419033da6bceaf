use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_core::{AggregateId, DomainResult, OrderId, OrderProductId};
use stockroom_inventory::{
    InventoryEvent, InventoryId, InventoryItemId, InventoryStatus, ItemSeed, ProductDetails,
    checked_total,
};

use crate::event_store::StoredEvent;
use crate::read_model::ReadModelStore;
use crate::repository::RECORD_AGGREGATE_TYPE;

/// One variant line of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogVariant {
    pub item_id: InventoryItemId,
    pub label: String,
    pub quantity: i64,
    pub verified: bool,
}

/// Queryable inventory read model: one entry per live record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub record_id: InventoryId,
    pub order_product_id: Option<OrderProductId>,
    pub order_id: Option<OrderId>,
    pub product_name: String,
    pub sku: Option<String>,
    pub status: InventoryStatus,
    pub rack_location: Option<String>,
    pub variants: Vec<CatalogVariant>,
    pub media_count: usize,
    pub received_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub picked_up_by: Option<String>,
    pub split_from: Option<InventoryId>,
}

impl CatalogEntry {
    fn new(record_id: InventoryId, details: &ProductDetails, items: &[ItemSeed]) -> Self {
        Self {
            record_id,
            order_product_id: None,
            order_id: None,
            product_name: details.product_name.clone(),
            sku: details.sku.clone(),
            status: InventoryStatus::Incoming,
            rack_location: None,
            variants: items
                .iter()
                .map(|s| CatalogVariant {
                    item_id: s.item_id,
                    label: s.variant.label.clone(),
                    quantity: s.quantity,
                    verified: false,
                })
                .collect(),
            media_count: 0,
            received_at: None,
            archived_at: None,
            picked_up_by: None,
            split_from: None,
        }
    }

    pub fn total_quantity(&self) -> DomainResult<i64> {
        checked_total(self.variants.iter().map(|v| v.quantity), "items.quantity")
    }

    fn variant_mut(&mut self, item_id: InventoryItemId) -> Option<&mut CatalogVariant> {
        self.variants.iter_mut().find(|v| v.item_id == item_id)
    }
}

#[derive(Debug, Error)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Inventory catalog projection.
///
/// Consumes stored inventory events and maintains a per-record summary used
/// for listings and the incoming-record guard. Disposable and rebuildable
/// from the event store.
#[derive(Debug)]
pub struct InventoryCatalogProjection<S>
where
    S: ReadModelStore<InventoryId, CatalogEntry>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> InventoryCatalogProjection<S>
where
    S: ReadModelStore<InventoryId, CatalogEntry>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, record_id: &InventoryId) -> Option<CatalogEntry> {
        self.store.get(record_id)
    }

    /// All live records, oldest id first.
    pub fn list(&self) -> Vec<CatalogEntry> {
        let mut entries = self.store.list();
        entries.sort_by_key(|e| e.record_id);
        entries
    }

    pub fn list_by_status(&self, status: InventoryStatus) -> Vec<CatalogEntry> {
        self.list()
            .into_iter()
            .filter(|e| e.status == status)
            .collect()
    }

    /// Order lines that already have a record, in any status.
    pub fn tracked_order_products(&self) -> Vec<OrderProductId> {
        self.store
            .list()
            .into_iter()
            .filter_map(|e| e.order_product_id)
            .collect()
    }

    /// Apply every event of a loaded stream not seen yet.
    pub fn apply_stream(&self, stream: &[StoredEvent]) -> Result<(), CatalogProjectionError> {
        for stored in stream {
            self.apply_event(stored)?;
        }
        Ok(())
    }

    /// Apply one stored event.
    ///
    /// - Enforces monotonic sequence per stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_event(&self, stored: &StoredEvent) -> Result<(), CatalogProjectionError> {
        if stored.aggregate_type != RECORD_AGGREGATE_TYPE {
            return Ok(());
        }
        let aggregate_id = stored.aggregate_id;
        let seq = stored.sequence_number;

        let mut cursors = self.cursors.write().map_err(|_| {
            CatalogProjectionError::StreamMismatch("cursor lock poisoned".to_string())
        })?;
        let last = *cursors.get(&aggregate_id).unwrap_or(&0);

        if seq == 0 {
            return Err(CatalogProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }
        if seq != last + 1 {
            return Err(CatalogProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: InventoryEvent = serde_json::from_value(stored.payload.clone())
            .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;

        let record_id = event.record_id();
        if record_id.0 != aggregate_id {
            return Err(CatalogProjectionError::StreamMismatch(
                "event record_id does not match stream aggregate_id".to_string(),
            ));
        }

        self.fold(record_id, event);
        cursors.insert(aggregate_id, seq);
        Ok(())
    }

    fn fold(&self, record_id: InventoryId, event: InventoryEvent) {
        match event {
            InventoryEvent::RecordRegistered(e) => {
                let mut entry = CatalogEntry::new(record_id, &e.details, &e.items);
                entry.order_product_id = e.origin.map(|o| o.order_product_id);
                entry.order_id = e.origin.map(|o| o.order_id);
                self.store.upsert(record_id, entry);
            }
            InventoryEvent::SplitArchived(e) => {
                let mut entry = CatalogEntry::new(record_id, &e.details, &e.items);
                entry.order_product_id = e.origin.map(|o| o.order_product_id);
                entry.order_id = e.origin.map(|o| o.order_id);
                entry.status = InventoryStatus::Archived;
                entry.rack_location = e.rack_location;
                entry.received_at = e.received_at;
                entry.archived_at = Some(e.occurred_at);
                entry.picked_up_by = Some(e.picked_up_by);
                entry.split_from = Some(e.source_record_id);
                self.store.upsert(record_id, entry);
            }
            InventoryEvent::RecordDeleted(_) => self.store.remove(&record_id),
            other => {
                let Some(mut entry) = self.store.get(&record_id) else {
                    return;
                };
                match other {
                    InventoryEvent::RecordReceived(e) => {
                        entry.status = InventoryStatus::InStock;
                        entry.rack_location = e.rack_location;
                        entry.received_at = Some(e.occurred_at);
                        for v in e.verifications {
                            if let Some(line) = entry.variant_mut(v.item_id) {
                                line.verified = v.verified;
                            }
                        }
                    }
                    InventoryEvent::MediaAttached(e) => entry.media_count += e.media.len(),
                    InventoryEvent::MediaDetached(_) => {
                        entry.media_count = entry.media_count.saturating_sub(1)
                    }
                    InventoryEvent::RecordRelocated(e) => entry.rack_location = e.rack_location,
                    InventoryEvent::TransactionRecorded(e) => {
                        let tx = e.transaction;
                        if let Some(line) = entry.variant_mut(tx.item_id) {
                            line.quantity = tx.quantity_after;
                        }
                    }
                    InventoryEvent::RecordPickedUp(e) => {
                        entry.status = InventoryStatus::Archived;
                        entry.archived_at = Some(e.occurred_at);
                        entry.picked_up_by = Some(e.picked_up_by);
                    }
                    InventoryEvent::PartialPickupSplit(e) => {
                        for split in e.lines {
                            if let Some(line) = entry.variant_mut(split.item_id) {
                                line.quantity = split.remaining_quantity;
                            }
                        }
                    }
                    InventoryEvent::RecordUnarchived(_) => {
                        entry.status = InventoryStatus::InStock;
                        entry.archived_at = None;
                        entry.picked_up_by = None;
                    }
                    InventoryEvent::RecordRegistered(_)
                    | InventoryEvent::SplitArchived(_)
                    | InventoryEvent::RecordDeleted(_) => {}
                }
                self.store.upsert(record_id, entry);
            }
        }
    }

    /// Rebuild the read model from scratch by replaying stored events.
    pub fn rebuild_from_scratch(
        &self,
        events: impl IntoIterator<Item = StoredEvent>,
    ) -> Result<(), CatalogProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.store.clear();

        // Deterministic replay order: commit order.
        let mut events: Vec<_> = events.into_iter().collect();
        events.sort_by_key(|e| e.global_position);

        for stored in &events {
            self.apply_event(stored)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use stockroom_core::{Actor, Role, UserId};
    use stockroom_inventory::{
        InventoryCommand, OrderLink, ReceiveRecord, RegisterRecord, Variant,
    };

    use crate::event_store::{EventStore, InMemoryEventStore};
    use crate::read_model::InMemoryReadModelStore;
    use crate::repository::RecordRepository;

    fn actor() -> Actor {
        Actor::new(UserId::new(), "Dana", Role::Warehouse)
    }

    fn registered_and_received(
        repo: &RecordRepository<InMemoryEventStore>,
        origin: Option<OrderLink>,
    ) -> InventoryId {
        let id = match origin {
            Some(link) => InventoryId::for_order_product(link.order_product_id),
            None => InventoryId::generate(),
        };
        repo.dispatch(
            id,
            &InventoryCommand::Register(RegisterRecord {
                record_id: id,
                origin,
                details: ProductDetails {
                    product_name: "Tee".to_string(),
                    ..ProductDetails::default()
                },
                items: vec![ItemSeed {
                    item_id: InventoryItemId::generate(),
                    variant: Variant::new("M"),
                    quantity: 4,
                }],
                actor: actor(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        repo.dispatch(
            id,
            &InventoryCommand::Receive(ReceiveRecord {
                record_id: id,
                rack_location: " B-2 ".to_string(),
                verified_variants: BTreeSet::from(["M".to_string()]),
                actor: actor(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        id
    }

    fn catalog() -> InventoryCatalogProjection<InMemoryReadModelStore<InventoryId, CatalogEntry>> {
        InventoryCatalogProjection::new(InMemoryReadModelStore::new())
    }

    #[test]
    fn folds_registration_and_receipt() {
        let repo = RecordRepository::new(InMemoryEventStore::new());
        let link = OrderLink {
            order_product_id: OrderProductId::new(),
            order_id: OrderId::new(),
            client_id: None,
        };
        let id = registered_and_received(&repo, Some(link));
        let projection = catalog();

        projection
            .apply_stream(&repo.store().load_stream(id.0).unwrap())
            .unwrap();

        let entry = projection.get(&id).unwrap();
        assert_eq!(entry.status, InventoryStatus::InStock);
        assert_eq!(entry.rack_location.as_deref(), Some("B-2"));
        assert_eq!(entry.order_id, Some(link.order_id));
        assert!(entry.variants[0].verified);
        assert_eq!(entry.total_quantity().unwrap(), 4);
        assert_eq!(projection.tracked_order_products(), vec![link.order_product_id]);
        assert_eq!(projection.list_by_status(InventoryStatus::Incoming), vec![]);
    }

    #[test]
    fn replays_are_ignored_and_gaps_rejected() {
        let repo = RecordRepository::new(InMemoryEventStore::new());
        let id = registered_and_received(&repo, None);
        let stream = repo.store().load_stream(id.0).unwrap();
        let projection = catalog();

        projection.apply_stream(&stream).unwrap();
        projection.apply_stream(&stream).unwrap();
        assert_eq!(projection.list().len(), 1);

        let fresh = catalog();
        let err = fresh.apply_event(&stream[1]).unwrap_err();
        assert!(matches!(
            err,
            CatalogProjectionError::NonMonotonicSequence { last: 0, found: 2 }
        ));
    }

    #[test]
    fn rebuild_matches_incremental_application() {
        let repo = RecordRepository::new(InMemoryEventStore::new());
        let a = registered_and_received(&repo, None);
        let b = registered_and_received(&repo, None);
        let live = catalog();
        for id in [a, b] {
            live.apply_stream(&repo.store().load_stream(id.0).unwrap()).unwrap();
        }

        let rebuilt = catalog();
        let mut all = repo.store().load_all().unwrap();
        all.reverse();
        rebuilt.rebuild_from_scratch(all).unwrap();

        assert_eq!(rebuilt.list(), live.list());
    }
}
