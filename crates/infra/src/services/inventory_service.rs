//! Inventory operations composed over the event store, the catalog read model
//! and the external collaborators.
//!
//! Every write loads the record, decides against it and appends with the
//! loaded version. Losing a concurrent race reloads and decides again, up to
//! `max_conflict_retries` times. Work on collaborators that happens after a
//! commit (order sync, notifications, media cleanup) is best-effort and is
//! reported in the outcome instead of undoing the commit.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use stockroom_core::{Actor, Aggregate, AggregateRoot, DomainError, MediaId, OrderId, TransactionId};
use stockroom_events::execute;
use stockroom_inventory::{
    AttachMedia, DeleteRecord, DetachMedia, IncomingRecord, InventoryCommand, InventoryEvent,
    InventoryId, InventoryItemId, InventoryMedia, InventoryRecord, InventoryStatus,
    InventoryTransaction, ItemSeed, PickUpRecord, PickupDecision, ProductDetails, ReceiveRecord,
    RecordTransaction, RegisterRecord, RelocateRecord, RequestPickup, SplitPlan, TransactionType,
    UnarchiveRecord, Variant, VirtualRecord, derive_virtual_records,
};
use stockroom_orders::RollupDecision;

use crate::config::StockroomConfig;
use crate::error::ServiceError;
use crate::event_store::EventStore;
use crate::external::media::delete_all;
use crate::external::{
    ArrivalNotice, MediaStore, MediaUpload, NotificationService, OrderGateway, UploadReport,
    UserDirectory, upload_all,
};
use crate::projections::{CatalogEntry, InventoryCatalogProjection};
use crate::read_model::ReadModelStore;
use crate::repository::{RecordRepository, RecordWrite};
use crate::services::order_sync::OrderSync;

/// External services the inventory service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub media: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn NotificationService>,
    pub users: Arc<dyn UserDirectory>,
    pub orders: Arc<dyn OrderGateway>,
}

/// Variant and initial quantity of a manually registered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVariant {
    pub variant: Variant,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub details: ProductDetails,
    pub variants: Vec<NewVariant>,
}

/// What is being received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveTarget {
    /// A shipped order line not persisted yet.
    Virtual(VirtualRecord),
    /// A record already persisted as `incoming`.
    Persisted(InventoryId),
}

impl ReceiveTarget {
    pub fn record_id(&self) -> InventoryId {
        match self {
            ReceiveTarget::Virtual(v) => v.record_id(),
            ReceiveTarget::Persisted(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub target: ReceiveTarget,
    pub rack_location: String,
    pub verified_variants: BTreeSet<String>,
    pub photos: Vec<MediaUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSyncOutcome {
    /// The record has no order line.
    NotLinked,
    /// Line marked delivered; carries the rollup result (`None` if the order had no live lines).
    Synced(Option<RollupDecision>),
    /// The receive stands; re-run the rollup to heal.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Disabled,
    NoRecipients,
    Sent { recipients: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub record: InventoryRecord,
    pub media: UploadReport,
    pub order_sync: OrderSyncOutcome,
    pub notification: NotificationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupRequest {
    pub record_id: InventoryId,
    /// `None` picks up everything.
    pub quantity: Option<i64>,
    pub picked_up_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupOutcome {
    Full(InventoryRecord),
    Partial {
        source: InventoryRecord,
        archived: InventoryRecord,
        plan: SplitPlan,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub record_id: InventoryId,
    pub item_id: InventoryItemId,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub counterpart_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOutcome {
    pub record: InventoryRecord,
    pub report: UploadReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachOutcome {
    pub record: InventoryRecord,
    /// Whether the stored file was removed as well.
    pub file_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub record_id: InventoryId,
    /// Attachments whose files could not be removed.
    pub media_delete_failures: usize,
}

pub struct InventoryService<S, R>
where
    S: EventStore,
    R: ReadModelStore<InventoryId, CatalogEntry>,
{
    repo: RecordRepository<S>,
    catalog: InventoryCatalogProjection<R>,
    media: Arc<dyn MediaStore>,
    notifier: Arc<dyn NotificationService>,
    users: Arc<dyn UserDirectory>,
    order_sync: OrderSync,
    config: StockroomConfig,
}

impl<S, R> InventoryService<S, R>
where
    S: EventStore,
    R: ReadModelStore<InventoryId, CatalogEntry>,
{
    /// Build the service and bring the catalog up to date with the store.
    pub fn new(
        store: S,
        catalog: R,
        collaborators: Collaborators,
        config: StockroomConfig,
    ) -> Result<Self, ServiceError> {
        let service = Self {
            repo: RecordRepository::new(store),
            catalog: InventoryCatalogProjection::new(catalog),
            media: collaborators.media,
            notifier: collaborators.notifier,
            users: collaborators.users,
            order_sync: OrderSync::new(collaborators.orders),
            config,
        };
        service.rebuild_catalog()?;
        Ok(service)
    }

    pub fn config(&self) -> &StockroomConfig {
        &self.config
    }

    pub fn order_sync(&self) -> &OrderSync {
        &self.order_sync
    }

    /// Incoming list: shipped lines without a record, then persisted `incoming` records.
    pub fn fetch_incoming(&self) -> Result<Vec<IncomingRecord>, ServiceError> {
        let tracked: HashSet<_> = self.catalog.tracked_order_products().into_iter().collect();
        let shipped = self
            .order_sync
            .gateway()
            .shipped_products()
            .map_err(|e| ServiceError::collaborator("order gateway", e))?;

        let mut incoming: Vec<IncomingRecord> = derive_virtual_records(&shipped, &tracked)
            .into_iter()
            .map(IncomingRecord::Virtual)
            .collect();
        for entry in self.catalog.list_by_status(InventoryStatus::Incoming) {
            incoming.push(IncomingRecord::Persisted(self.repo.load_existing(entry.record_id)?));
        }

        debug!(count = incoming.len(), "fetched incoming records");
        Ok(incoming)
    }

    /// Persist a manually created record as `incoming`.
    pub fn register(&self, new: NewRecord, actor: &Actor) -> Result<InventoryRecord, ServiceError> {
        let record_id = InventoryId::generate();
        let command = InventoryCommand::Register(RegisterRecord {
            record_id,
            origin: None,
            details: new.details,
            items: new
                .variants
                .into_iter()
                .map(|v| ItemSeed {
                    item_id: InventoryItemId::generate(),
                    variant: v.variant,
                    quantity: v.quantity,
                })
                .collect(),
            actor: actor.clone(),
            occurred_at: Utc::now(),
        });

        let (record, _) = self.repo.dispatch(record_id, &command)?;
        self.refresh_catalog(&[record_id]);
        info!(record_id = %record_id, actor = %actor.id, "inventory record registered");
        Ok(record)
    }

    /// Receive a virtual or persisted incoming record.
    ///
    /// Registration (for virtual records), receipt and media attachment are
    /// appended as one write. Uploaded files are removed again if that write
    /// fails.
    pub fn receive(&self, mut request: ReceiveRequest, actor: &Actor) -> Result<ReceiveOutcome, ServiceError> {
        actor.validate()?;
        self.check_media_count(request.photos.len(), "photos")?;
        let record_id = request.target.record_id();

        // Fail fast before uploading anything.
        let current = self.repo.load(record_id)?;
        let refreshed = match &request.target {
            ReceiveTarget::Persisted(_) if !current.exists() => {
                return Err(DomainError::not_found(format!("inventory record {record_id}")).into());
            }
            // An existing record makes the registration fail with a constraint error.
            ReceiveTarget::Virtual(stale) if !current.exists() => Some(self.shipped_line(stale)?),
            _ => None,
        };
        if let Some(line) = refreshed {
            request.target = ReceiveTarget::Virtual(line);
        }
        decide_receive(&current, &request, &[], actor)?;

        let report = upload_all(
            self.media.as_ref(),
            record_id,
            &request.photos,
            actor.id,
            Utc::now(),
        );

        let committed = self.with_conflict_retry("receive", || {
            let record = self.repo.load(record_id)?;
            let (received, events) = decide_receive(&record, &request, &report.uploaded, actor)?;
            self.repo.commit(vec![RecordWrite::against(&record, events)])?;
            Ok(received)
        });

        let record = match committed {
            Ok(record) => record,
            Err(err) => {
                let orphaned = delete_all(self.media.as_ref(), report.urls());
                warn!(
                    record_id = %record_id,
                    error = %err,
                    removed = report.uploaded.len() - orphaned,
                    orphaned,
                    "receive failed; uploaded media removed"
                );
                return Err(err);
            }
        };

        self.refresh_catalog(&[record_id]);
        info!(
            record_id = %record_id,
            actor = %actor.id,
            media = report.uploaded.len(),
            media_failed = report.failed_count(),
            "inventory record received"
        );

        let order_sync = match record.origin() {
            None => OrderSyncOutcome::NotLinked,
            Some(link) => {
                let received_at = record.received_at().unwrap_or_else(Utc::now);
                match self.order_sync.mark_delivered(link, record_id, received_at) {
                    Ok(decision) => OrderSyncOutcome::Synced(decision),
                    Err(err) => {
                        warn!(
                            record_id = %record_id,
                            order_id = %link.order_id,
                            error = %err,
                            "order sync after receive failed"
                        );
                        OrderSyncOutcome::Failed(err.to_string())
                    }
                }
            }
        };

        let notification = self.notify_arrival(&record, actor);

        Ok(ReceiveOutcome {
            record,
            media: report,
            order_sync,
            notification,
        })
    }

    /// Full pickup (`quantity: None` or the whole total) or partial pickup.
    pub fn pick_up(&self, request: PickupRequest, actor: &Actor) -> Result<PickupOutcome, ServiceError> {
        let record_id = request.record_id;
        let archived_record_id = InventoryId::generate();

        let outcome = self.with_conflict_retry("pick_up", || {
            let source = self.repo.load_existing(record_id)?;
            let occurred_at = Utc::now();

            let decision = match request.quantity {
                None => PickupDecision::Full(source.handle(&InventoryCommand::PickUp(
                    PickUpRecord {
                        record_id,
                        picked_up_by: request.picked_up_by.clone(),
                        actor: actor.clone(),
                        occurred_at,
                    },
                ))?),
                Some(quantity) => source.decide_pickup(&RequestPickup {
                    record_id,
                    archived_record_id,
                    quantity,
                    picked_up_by: request.picked_up_by.clone(),
                    actor: actor.clone(),
                    occurred_at,
                })?,
            };

            match decision {
                PickupDecision::Full(events) => {
                    self.repo
                        .commit(vec![RecordWrite::against(&source, events.clone())])?;
                    Ok(PickupOutcome::Full(evolve(source, &events)))
                }
                PickupDecision::Split(fork) => {
                    self.repo.commit(vec![
                        RecordWrite::against(&source, fork.source_events.clone()),
                        RecordWrite {
                            record_id: fork.archived_record_id,
                            expected_version: 0,
                            events: fork.archived_events.clone(),
                        },
                    ])?;
                    Ok(PickupOutcome::Partial {
                        source: evolve(source, &fork.source_events),
                        archived: evolve(
                            InventoryRecord::empty(fork.archived_record_id),
                            &fork.archived_events,
                        ),
                        plan: fork.plan,
                    })
                }
            }
        })?;

        match &outcome {
            PickupOutcome::Full(record) => {
                self.refresh_catalog(&[record_id]);
                info!(
                    record_id = %record_id,
                    actor = %actor.id,
                    total = ?record.total_quantity().ok(),
                    "inventory record picked up"
                );
            }
            PickupOutcome::Partial { archived, plan, .. } => {
                self.refresh_catalog(&[record_id, archived.id_typed()]);
                if plan.drift() != 0 {
                    warn!(
                        record_id = %record_id,
                        pickup = plan.pickup_quantity,
                        total = plan.total,
                        drift = plan.drift(),
                        "partial pickup rounding changed the total"
                    );
                }
                info!(
                    record_id = %record_id,
                    archived_record_id = %archived.id_typed(),
                    actor = %actor.id,
                    picked_up = plan.archived_total(),
                    remaining = plan.remaining_total(),
                    "inventory record split by partial pickup"
                );
            }
        }
        Ok(outcome)
    }

    pub fn unarchive(&self, record_id: InventoryId, actor: &Actor) -> Result<InventoryRecord, ServiceError> {
        let record = self.dispatch_with_retry("unarchive", record_id, || {
            InventoryCommand::Unarchive(UnarchiveRecord {
                record_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        })?
        .0;
        info!(record_id = %record_id, actor = %actor.id, "inventory record unarchived");
        Ok(record)
    }

    pub fn relocate(
        &self,
        record_id: InventoryId,
        rack_location: &str,
        notes: Option<&str>,
        actor: &Actor,
    ) -> Result<InventoryRecord, ServiceError> {
        let record = self.dispatch_with_retry("relocate", record_id, || {
            InventoryCommand::Relocate(RelocateRecord {
                record_id,
                rack_location: rack_location.to_string(),
                notes: notes.map(str::to_string),
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        })?
        .0;
        info!(record_id = %record_id, rack_location = ?record.rack_location(), "inventory record relocated");
        Ok(record)
    }

    /// Append one ledger entry; concurrent writers never share a "before" quantity.
    pub fn record_transaction(
        &self,
        request: TransactionRequest,
        actor: &Actor,
    ) -> Result<InventoryTransaction, ServiceError> {
        let transaction_id = TransactionId::new();
        let (record, _) = self.dispatch_with_retry("record_transaction", request.record_id, || {
            InventoryCommand::RecordTransaction(RecordTransaction {
                record_id: request.record_id,
                item_id: request.item_id,
                transaction_id,
                transaction_type: request.transaction_type,
                quantity: request.quantity,
                counterpart_name: request.counterpart_name.clone(),
                notes: request.notes.clone(),
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        })?;

        let transaction = record
            .item(request.item_id)
            .and_then(|item| item.history().next().cloned())
            .filter(|tx| tx.id == transaction_id)
            .ok_or_else(|| DomainError::invariant("committed transaction missing from ledger"))?;

        info!(
            record_id = %request.record_id,
            item_id = %request.item_id,
            transaction_type = %transaction.transaction_type,
            before = transaction.quantity_before,
            after = transaction.quantity_after,
            "inventory transaction recorded"
        );
        Ok(transaction)
    }

    /// Ledger of one item, most recent first.
    pub fn history(
        &self,
        record_id: InventoryId,
        item_id: InventoryItemId,
    ) -> Result<Vec<InventoryTransaction>, ServiceError> {
        let record = self.repo.load_existing(record_id)?;
        let item = record
            .item(item_id)
            .ok_or_else(|| DomainError::not_found(format!("inventory item {item_id}")))?;
        Ok(item.history().cloned().collect())
    }

    pub fn record(&self, record_id: InventoryId) -> Result<InventoryRecord, ServiceError> {
        self.repo.load_existing(record_id)
    }

    /// Stream version of a record; 0 if it was never written.
    pub fn record_version(&self, record_id: InventoryId) -> Result<u64, ServiceError> {
        Ok(self.repo.load(record_id)?.version())
    }

    /// Upload and attach evidence. Failed uploads are reported, not fatal.
    pub fn attach_media(
        &self,
        record_id: InventoryId,
        files: Vec<MediaUpload>,
        actor: &Actor,
    ) -> Result<MediaOutcome, ServiceError> {
        actor.validate()?;
        if files.is_empty() {
            return Err(DomainError::validation("media", "no files to attach").into());
        }
        self.check_media_count(files.len(), "media")?;
        let record = self.repo.load_existing(record_id)?;

        let report = upload_all(self.media.as_ref(), record_id, &files, actor.id, Utc::now());
        if report.uploaded.is_empty() {
            warn!(record_id = %record_id, failed = report.failed_count(), "no media could be uploaded");
            return Ok(MediaOutcome { record, report });
        }

        let attached = self.dispatch_with_retry("attach_media", record_id, || {
            InventoryCommand::AttachMedia(AttachMedia {
                record_id,
                media: report.uploaded.clone(),
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        });

        match attached {
            Ok((record, _)) => {
                info!(
                    record_id = %record_id,
                    attached = report.uploaded.len(),
                    failed = report.failed_count(),
                    "media attached"
                );
                Ok(MediaOutcome { record, report })
            }
            Err(err) => {
                let orphaned = delete_all(self.media.as_ref(), report.urls());
                warn!(record_id = %record_id, error = %err, orphaned, "attach failed; uploaded media removed");
                Err(err)
            }
        }
    }

    pub fn detach_media(
        &self,
        record_id: InventoryId,
        media_id: MediaId,
        actor: &Actor,
    ) -> Result<DetachOutcome, ServiceError> {
        let (record, events) = self.dispatch_with_retry("detach_media", record_id, || {
            InventoryCommand::DetachMedia(DetachMedia {
                record_id,
                media_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        })?;

        let urls: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                InventoryEvent::MediaDetached(d) => Some(d.url.as_str()),
                _ => None,
            })
            .collect();
        let file_deleted = delete_all(self.media.as_ref(), urls) == 0;
        info!(record_id = %record_id, media_id = %media_id, file_deleted, "media detached");
        Ok(DetachOutcome { record, file_deleted })
    }

    /// Delete a record with its items and media. Never touches the order side.
    pub fn delete(&self, record_id: InventoryId, actor: &Actor) -> Result<DeleteOutcome, ServiceError> {
        let (_, events) = self.dispatch_with_retry("delete", record_id, || {
            InventoryCommand::Delete(DeleteRecord {
                record_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        })?;

        let urls: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                InventoryEvent::RecordDeleted(d) => Some(d.media_urls.iter().map(String::as_str)),
                _ => None,
            })
            .flatten()
            .collect();
        let media_delete_failures = delete_all(self.media.as_ref(), urls);

        self.refresh_catalog(&[record_id]);
        info!(record_id = %record_id, actor = %actor.id, media_delete_failures, "inventory record deleted");
        Ok(DeleteOutcome {
            record_id,
            media_delete_failures,
        })
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.catalog.list()
    }

    pub fn catalog_entry(&self, record_id: InventoryId) -> Option<CatalogEntry> {
        self.catalog.get(&record_id)
    }

    /// Rebuild the catalog from the full event log. Returns the number of events replayed.
    pub fn rebuild_catalog(&self) -> Result<usize, ServiceError> {
        let events = self.repo.store().load_all()?;
        let replayed = events.len();
        self.catalog.rebuild_from_scratch(events)?;
        info!(replayed, "inventory catalog rebuilt");
        Ok(replayed)
    }

    /// Re-run the rollup for an order, e.g. after a failed sync.
    pub fn resync_order(&self, order_id: OrderId) -> Result<Option<RollupDecision>, ServiceError> {
        self.order_sync.recompute(order_id)
    }

    fn notify_arrival(&self, record: &InventoryRecord, actor: &Actor) -> NotificationOutcome {
        if !self.config.notify_on_arrival {
            return NotificationOutcome::Disabled;
        }
        let record_id = record.id_typed();

        let recipients = match self.users.admin_recipients() {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!(record_id = %record_id, error = %err, "arrival recipients unavailable");
                return NotificationOutcome::Failed(err.to_string());
            }
        };
        if recipients.is_empty() {
            return NotificationOutcome::NoRecipients;
        }
        let total_quantity = match record.total_quantity() {
            Ok(total) => total,
            Err(err) => {
                warn!(record_id = %record_id, error = %err, "arrival notice skipped");
                return NotificationOutcome::Failed(err.to_string());
            }
        };

        let notice = ArrivalNotice {
            record_id,
            product_name: record.details().product_name.clone(),
            order_id: record.origin().map(|o| o.order_id),
            total_quantity,
            received_by: actor.name.clone(),
            received_at: record.received_at().unwrap_or_else(Utc::now),
        };
        match self.notifier.fan_out_arrival(&notice, &recipients) {
            Ok(()) => NotificationOutcome::Sent {
                recipients: recipients.len(),
            },
            Err(err) => {
                warn!(record_id = %record_id, error = %err, "arrival notification failed");
                NotificationOutcome::Failed(err.to_string())
            }
        }
    }

    /// The order line behind a virtual record, as the order side reports it now.
    fn shipped_line(&self, stale: &VirtualRecord) -> Result<VirtualRecord, ServiceError> {
        let order_product_id = stale.origin.order_product_id;
        let shipped = self
            .order_sync
            .gateway()
            .shipped_products()
            .map_err(|e| ServiceError::collaborator("order gateway", e))?;

        shipped
            .iter()
            .find(|p| p.link.order_product_id == order_product_id)
            .map(VirtualRecord::from_shipped)
            .ok_or_else(|| {
                DomainError::not_found(format!("shipped order line {order_product_id}")).into()
            })
    }

    fn check_media_count(&self, count: usize, field: &'static str) -> Result<(), ServiceError> {
        let max = self.config.max_media_per_operation;
        if count > max {
            return Err(DomainError::validation(field, format!("at most {max} files per upload")).into());
        }
        Ok(())
    }

    fn dispatch_with_retry(
        &self,
        operation: &'static str,
        record_id: InventoryId,
        command: impl Fn() -> InventoryCommand,
    ) -> Result<(InventoryRecord, Vec<InventoryEvent>), ServiceError> {
        let result = self.with_conflict_retry(operation, || {
            let record = self.repo.load_existing(record_id)?;
            let command = command();
            let events = record.handle(&command)?;
            self.repo
                .commit(vec![RecordWrite::against(&record, events.clone())])?;
            Ok((evolve(record, &events), events))
        })?;
        self.refresh_catalog(&[record_id]);
        Ok(result)
    }

    fn with_conflict_retry<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let max_attempts = self.config.max_conflict_retries.saturating_add(1);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match attempt() {
                Err(err) if err.is_conflict() => {
                    if attempts >= max_attempts {
                        warn!(operation, attempts, error = %err, "giving up after repeated conflicts");
                        return Err(ServiceError::ConflictRetriesExhausted {
                            attempts,
                            message: err.to_string(),
                        });
                    }
                    debug!(operation, attempt = attempts, "concurrency conflict; reloading");
                }
                other => return other,
            }
        }
    }

    /// Bring the catalog up to date with the given streams.
    ///
    /// The catalog is disposable, so failures are logged and left for a rebuild.
    fn refresh_catalog(&self, record_ids: &[InventoryId]) {
        for record_id in record_ids {
            let refreshed = self
                .repo
                .store()
                .load_stream(record_id.0)
                .map_err(ServiceError::from)
                .and_then(|stream| Ok(self.catalog.apply_stream(&stream)?));
            if let Err(err) = refreshed {
                warn!(record_id = %record_id, error = %err, "catalog refresh failed");
            }
        }
    }
}

/// Registration (for virtual targets), receipt and attachment, decided in order.
fn decide_receive(
    record: &InventoryRecord,
    request: &ReceiveRequest,
    media: &[InventoryMedia],
    actor: &Actor,
) -> Result<(InventoryRecord, Vec<InventoryEvent>), DomainError> {
    let occurred_at = Utc::now();
    let record_id = request.target.record_id();
    let mut working = record.clone();
    let mut events = Vec::new();

    if let ReceiveTarget::Virtual(virtual_record) = &request.target {
        let register = virtual_record.registration(actor.clone(), occurred_at);
        events.extend(execute(&mut working, &InventoryCommand::Register(register))?);
    }

    events.extend(execute(
        &mut working,
        &InventoryCommand::Receive(ReceiveRecord {
            record_id,
            rack_location: request.rack_location.clone(),
            verified_variants: request.verified_variants.clone(),
            actor: actor.clone(),
            occurred_at,
        }),
    )?);

    if !media.is_empty() {
        events.extend(execute(
            &mut working,
            &InventoryCommand::AttachMedia(AttachMedia {
                record_id,
                media: media.to_vec(),
                actor: actor.clone(),
                occurred_at,
            }),
        )?);
    }

    Ok((working, events))
}

fn evolve(mut record: InventoryRecord, events: &[InventoryEvent]) -> InventoryRecord {
    for ev in events {
        record.apply(ev);
    }
    record
}
