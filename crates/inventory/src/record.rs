use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    Actor, Aggregate, AggregateId, AggregateRoot, ClientId, DomainError, DomainResult, MediaId,
    OrderId, OrderProductId, TransactionId, UserId,
};
use stockroom_events::Event;

use crate::item::{InventoryItem, InventoryItemId, Variant, checked_total};
use crate::media::InventoryMedia;
use crate::split::{SplitLine, SplitPlan};
use crate::status::InventoryStatus;
use crate::transaction::{InventoryTransaction, TransactionType};

/// Inventory record identifier (one event stream per record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryId(pub AggregateId);

impl InventoryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }

    /// Stream id of the record materialized from a shipped order line.
    ///
    /// Reusing the line's id means the store rejects a second materialization
    /// of the same line.
    pub fn for_order_product(id: OrderProductId) -> Self {
        Self(AggregateId::from_uuid(*id.as_uuid()))
    }
}

impl core::fmt::Display for InventoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Back-reference to the order line a record was shipped for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLink {
    pub order_product_id: OrderProductId,
    pub order_id: OrderId,
    pub client_id: Option<ClientId>,
}

/// Descriptive product fields copied onto split records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub product_name: String,
    pub sku: Option<String>,
    pub notes: Option<String>,
}

/// Initial state of one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSeed {
    pub item_id: InventoryItemId,
    pub variant: Variant,
    pub quantity: i64,
}

/// Per-variant verification written at receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemVerification {
    pub item_id: InventoryItemId,
    pub verified: bool,
}

/// Aggregate root: InventoryRecord.
///
/// Owns its variants (each with a quantity ledger) and media attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    id: InventoryId,
    status: InventoryStatus,
    origin: Option<OrderLink>,
    details: ProductDetails,
    rack_location: Option<String>,
    received_at: Option<DateTime<Utc>>,
    received_by: Option<UserId>,
    archived_at: Option<DateTime<Utc>>,
    archived_by: Option<UserId>,
    picked_up_by: Option<String>,
    split_from: Option<InventoryId>,
    splits: Vec<PartialPickupSplit>,
    items: Vec<InventoryItem>,
    media: Vec<InventoryMedia>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl InventoryRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryId) -> Self {
        Self {
            id,
            status: InventoryStatus::Incoming,
            origin: None,
            details: ProductDetails::default(),
            rack_location: None,
            received_at: None,
            received_by: None,
            archived_at: None,
            archived_by: None,
            picked_up_by: None,
            split_from: None,
            splits: Vec::new(),
            items: Vec::new(),
            media: Vec::new(),
            created_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> InventoryId {
        self.id
    }

    /// Created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn status(&self) -> InventoryStatus {
        self.status
    }

    pub fn origin(&self) -> Option<&OrderLink> {
        self.origin.as_ref()
    }

    pub fn details(&self) -> &ProductDetails {
        &self.details
    }

    pub fn rack_location(&self) -> Option<&str> {
        self.rack_location.as_deref()
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn received_by(&self) -> Option<UserId> {
        self.received_by
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn archived_by(&self) -> Option<UserId> {
        self.archived_by
    }

    pub fn picked_up_by(&self) -> Option<&str> {
        self.picked_up_by.as_deref()
    }

    pub fn split_from(&self) -> Option<InventoryId> {
        self.split_from
    }

    /// Partial-pickup audit entries, oldest first.
    pub fn splits(&self) -> &[PartialPickupSplit] {
        &self.splits
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn item(&self, item_id: InventoryItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.id() == item_id)
    }

    pub fn media(&self) -> &[InventoryMedia] {
        &self.media
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn total_quantity(&self) -> DomainResult<i64> {
        checked_total(self.items.iter().map(|i| i.expected_quantity()), "items.quantity")
    }

    /// Record and item invariants that must hold after every applied event.
    pub fn check_invariants(&self) -> DomainResult<()> {
        if !self.exists() {
            return Ok(());
        }
        if matches!(self.status, InventoryStatus::InStock | InventoryStatus::Archived)
            && self.received_at.is_none()
        {
            return Err(DomainError::invariant(format!(
                "record {} is {} without received_at",
                self.id, self.status
            )));
        }
        if self.status == InventoryStatus::Archived
            && (self.archived_at.is_none() || self.picked_up_by.is_none())
        {
            return Err(DomainError::invariant(format!(
                "record {} is archived without archived_at/picked_up_by",
                self.id
            )));
        }
        if let Some(item) = self.items.iter().find(|i| !i.ledger_matches_quantity()) {
            return Err(DomainError::invariant(format!(
                "item {} quantity does not match its ledger",
                item.id()
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for InventoryRecord {
    type Id = InventoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterRecord (persist a record as `incoming`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRecord {
    pub record_id: InventoryId,
    pub origin: Option<OrderLink>,
    pub details: ProductDetails,
    pub items: Vec<ItemSeed>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveRecord (`incoming → in_stock`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveRecord {
    pub record_id: InventoryId,
    /// May be empty.
    pub rack_location: String,
    /// Labels of the variants whose physical count was confirmed.
    pub verified_variants: BTreeSet<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachMedia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachMedia {
    pub record_id: InventoryId,
    pub media: Vec<InventoryMedia>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DetachMedia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachMedia {
    pub record_id: InventoryId,
    pub media_id: MediaId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RelocateRecord (new rack location and notes of an `in_stock` record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocateRecord {
    pub record_id: InventoryId,
    pub rack_location: String,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordTransaction (append to an item's quantity ledger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTransaction {
    pub record_id: InventoryId,
    pub item_id: InventoryItemId,
    pub transaction_id: TransactionId,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub counterpart_name: Option<String>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PickUpRecord (`in_stock → archived`, full pickup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickUpRecord {
    pub record_id: InventoryId,
    pub picked_up_by: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnarchiveRecord (`archived → in_stock`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnarchiveRecord {
    pub record_id: InventoryId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecord {
    pub record_id: InventoryId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    Register(RegisterRecord),
    Receive(ReceiveRecord),
    AttachMedia(AttachMedia),
    DetachMedia(DetachMedia),
    Relocate(RelocateRecord),
    RecordTransaction(RecordTransaction),
    PickUp(PickUpRecord),
    Unarchive(UnarchiveRecord),
    Delete(DeleteRecord),
}

/// Pickup of `quantity` units, decided by [`InventoryRecord::decide_pickup`].
///
/// Picking up the whole total is a full pickup; anything less forks the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPickup {
    pub record_id: InventoryId,
    /// Id for the archived record created by a partial pickup.
    pub archived_record_id: InventoryId,
    pub quantity: i64,
    pub picked_up_by: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRegistered {
    pub record_id: InventoryId,
    pub origin: Option<OrderLink>,
    pub details: ProductDetails,
    pub items: Vec<ItemSeed>,
    pub registered_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReceived {
    pub record_id: InventoryId,
    pub rack_location: Option<String>,
    pub verifications: Vec<ItemVerification>,
    pub received_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MediaAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttached {
    pub record_id: InventoryId,
    pub media: Vec<InventoryMedia>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MediaDetached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDetached {
    pub record_id: InventoryId,
    pub media_id: MediaId,
    pub url: String,
    pub detached_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordRelocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRelocated {
    pub record_id: InventoryId,
    pub rack_location: Option<String>,
    pub notes: Option<String>,
    pub relocated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionRecorded (one ledger entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecorded {
    pub record_id: InventoryId,
    pub transaction: InventoryTransaction,
}

/// Event: RecordPickedUp (full pickup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPickedUp {
    pub record_id: InventoryId,
    pub picked_up_by: String,
    pub archived_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartialPickupSplit.
///
/// Audit entry on the source record. The split is structural and never
/// appears in the item ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPickupSplit {
    pub record_id: InventoryId,
    pub archived_record_id: InventoryId,
    pub picked_up_quantity: i64,
    pub remaining_quantity: i64,
    /// Units created by per-variant rounding.
    pub drift: i64,
    pub lines: Vec<SplitLine>,
    pub picked_up_by: String,
    pub split_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SplitArchived (creates the archived half of a partial pickup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitArchived {
    pub record_id: InventoryId,
    pub source_record_id: InventoryId,
    pub origin: Option<OrderLink>,
    pub details: ProductDetails,
    pub rack_location: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<UserId>,
    pub items: Vec<ItemSeed>,
    pub picked_up_by: String,
    pub archived_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordUnarchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUnarchived {
    pub record_id: InventoryId,
    pub unarchived_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDeleted {
    pub record_id: InventoryId,
    /// Attachment urls to release from the media store.
    pub media_urls: Vec<String>,
    pub deleted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    RecordRegistered(RecordRegistered),
    RecordReceived(RecordReceived),
    MediaAttached(MediaAttached),
    MediaDetached(MediaDetached),
    RecordRelocated(RecordRelocated),
    TransactionRecorded(TransactionRecorded),
    RecordPickedUp(RecordPickedUp),
    PartialPickupSplit(PartialPickupSplit),
    SplitArchived(SplitArchived),
    RecordUnarchived(RecordUnarchived),
    RecordDeleted(RecordDeleted),
}

impl InventoryEvent {
    pub fn record_id(&self) -> InventoryId {
        match self {
            InventoryEvent::RecordRegistered(e) => e.record_id,
            InventoryEvent::RecordReceived(e) => e.record_id,
            InventoryEvent::MediaAttached(e) => e.record_id,
            InventoryEvent::MediaDetached(e) => e.record_id,
            InventoryEvent::RecordRelocated(e) => e.record_id,
            InventoryEvent::TransactionRecorded(e) => e.record_id,
            InventoryEvent::RecordPickedUp(e) => e.record_id,
            InventoryEvent::PartialPickupSplit(e) => e.record_id,
            InventoryEvent::SplitArchived(e) => e.record_id,
            InventoryEvent::RecordUnarchived(e) => e.record_id,
            InventoryEvent::RecordDeleted(e) => e.record_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::RecordRegistered(_) => "inventory.record.registered",
            InventoryEvent::RecordReceived(_) => "inventory.record.received",
            InventoryEvent::MediaAttached(_) => "inventory.record.media_attached",
            InventoryEvent::MediaDetached(_) => "inventory.record.media_detached",
            InventoryEvent::RecordRelocated(_) => "inventory.record.relocated",
            InventoryEvent::TransactionRecorded(_) => "inventory.item.transaction_recorded",
            InventoryEvent::RecordPickedUp(_) => "inventory.record.picked_up",
            InventoryEvent::PartialPickupSplit(_) => "inventory.record.partial_pickup_split",
            InventoryEvent::SplitArchived(_) => "inventory.record.split_archived",
            InventoryEvent::RecordUnarchived(_) => "inventory.record.unarchived",
            InventoryEvent::RecordDeleted(_) => "inventory.record.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::RecordRegistered(e) => e.occurred_at,
            InventoryEvent::RecordReceived(e) => e.occurred_at,
            InventoryEvent::MediaAttached(e) => e.occurred_at,
            InventoryEvent::MediaDetached(e) => e.occurred_at,
            InventoryEvent::RecordRelocated(e) => e.occurred_at,
            InventoryEvent::TransactionRecorded(e) => e.transaction.created_at,
            InventoryEvent::RecordPickedUp(e) => e.occurred_at,
            InventoryEvent::PartialPickupSplit(e) => e.occurred_at,
            InventoryEvent::SplitArchived(e) => e.occurred_at,
            InventoryEvent::RecordUnarchived(e) => e.occurred_at,
            InventoryEvent::RecordDeleted(e) => e.occurred_at,
        }
    }
}

/// Outcome of a pickup decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupDecision {
    /// The whole record leaves: events for this record only.
    Full(Vec<InventoryEvent>),
    /// Part of the record leaves: events for this record and a new archived one.
    Split(PickupFork),
}

/// Both halves of a partial pickup. They must be committed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupFork {
    pub plan: SplitPlan,
    pub source_events: Vec<InventoryEvent>,
    pub archived_record_id: InventoryId,
    pub archived_events: Vec<InventoryEvent>,
}

impl Aggregate for InventoryRecord {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::RecordRegistered(e) => {
                let version = self.version;
                *self = Self::empty(e.record_id);
                self.version = version;
                self.origin = e.origin;
                self.details = e.details.clone();
                self.items = e
                    .items
                    .iter()
                    .map(|s| InventoryItem::new(s.item_id, s.variant.clone(), s.quantity))
                    .collect();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            InventoryEvent::RecordReceived(e) => {
                self.status = InventoryStatus::InStock;
                self.rack_location = e.rack_location.clone();
                self.received_at = Some(e.occurred_at);
                self.received_by = Some(e.received_by);
                for v in &e.verifications {
                    if let Some(item) = self.items.iter_mut().find(|i| i.id() == v.item_id) {
                        item.mark_verified(v.verified, e.occurred_at);
                    }
                }
            }
            InventoryEvent::MediaAttached(e) => {
                self.media.extend(e.media.iter().cloned());
            }
            InventoryEvent::MediaDetached(e) => {
                self.media.retain(|m| m.id != e.media_id);
            }
            InventoryEvent::RecordRelocated(e) => {
                self.rack_location = e.rack_location.clone();
                self.details.notes = e.notes.clone();
            }
            InventoryEvent::TransactionRecorded(e) => {
                let tx = &e.transaction;
                if let Some(item) = self.items.iter_mut().find(|i| i.id() == tx.item_id) {
                    item.append_transaction(tx.clone());
                }
            }
            InventoryEvent::RecordPickedUp(e) => {
                self.status = InventoryStatus::Archived;
                self.archived_at = Some(e.occurred_at);
                self.archived_by = Some(e.archived_by);
                self.picked_up_by = Some(e.picked_up_by.clone());
            }
            InventoryEvent::PartialPickupSplit(e) => {
                for line in &e.lines {
                    if let Some(item) = self.items.iter_mut().find(|i| i.id() == line.item_id) {
                        item.reset_after_split(line.remaining_quantity, e.occurred_at);
                    }
                }
                self.splits.push(e.clone());
            }
            InventoryEvent::SplitArchived(e) => {
                let version = self.version;
                *self = Self::empty(e.record_id);
                self.version = version;
                self.status = InventoryStatus::Archived;
                self.origin = e.origin;
                self.details = e.details.clone();
                self.rack_location = e.rack_location.clone();
                self.received_at = e.received_at;
                self.received_by = e.received_by;
                self.archived_at = Some(e.occurred_at);
                self.archived_by = Some(e.archived_by);
                self.picked_up_by = Some(e.picked_up_by.clone());
                self.split_from = Some(e.source_record_id);
                self.items = e
                    .items
                    .iter()
                    .map(|s| InventoryItem::new(s.item_id, s.variant.clone(), s.quantity))
                    .collect();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            InventoryEvent::RecordUnarchived(_) => {
                self.status = InventoryStatus::InStock;
                self.archived_at = None;
                self.archived_by = None;
                self.picked_up_by = None;
            }
            InventoryEvent::RecordDeleted(_) => {
                self.deleted = true;
                self.items.clear();
                self.media.clear();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::Register(cmd) => self.handle_register(cmd),
            InventoryCommand::Receive(cmd) => self.handle_receive(cmd),
            InventoryCommand::AttachMedia(cmd) => self.handle_attach_media(cmd),
            InventoryCommand::DetachMedia(cmd) => self.handle_detach_media(cmd),
            InventoryCommand::Relocate(cmd) => self.handle_relocate(cmd),
            InventoryCommand::RecordTransaction(cmd) => self.handle_record_transaction(cmd),
            InventoryCommand::PickUp(cmd) => self.handle_pick_up(cmd),
            InventoryCommand::Unarchive(cmd) => self.handle_unarchive(cmd),
            InventoryCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(field: &'static str, value: &str, label: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(field, format!("{label} is required")));
    }
    Ok(value.to_string())
}

impl InventoryRecord {
    fn ensure_record_id(&self, record_id: InventoryId) -> Result<(), DomainError> {
        if self.id != record_id {
            return Err(DomainError::invariant("record_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found(format!("inventory record {}", self.id)));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: InventoryStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::validation(
                "status",
                format!("cannot {action} a record that is {}", self.status),
            ));
        }
        Ok(())
    }

    /// Shared preconditions of every command on an existing record.
    fn ensure_target(&self, record_id: InventoryId, actor: &Actor) -> Result<(), DomainError> {
        self.ensure_exists()?;
        self.ensure_record_id(record_id)?;
        actor.validate()
    }

    fn handle_register(&self, cmd: &RegisterRecord) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_record_id(cmd.record_id)?;
        if self.exists() {
            return Err(match cmd.origin {
                Some(link) => DomainError::constraint(format!(
                    "order line {} already has an inventory record",
                    link.order_product_id
                )),
                None => DomainError::conflict("inventory record already exists"),
            });
        }
        cmd.actor.validate()?;

        let product_name = required("product_name", &cmd.details.product_name, "product name")?;

        let mut labels = HashSet::new();
        let mut item_ids = HashSet::new();
        let mut items = Vec::with_capacity(cmd.items.len());
        for seed in &cmd.items {
            let label = required("items.variant", &seed.variant.label, "variant label")?;
            if !labels.insert(label.clone()) {
                return Err(DomainError::validation(
                    "items.variant",
                    format!("duplicate variant `{label}`"),
                ));
            }
            if !item_ids.insert(seed.item_id) {
                return Err(DomainError::invariant(format!(
                    "duplicate item id {}",
                    seed.item_id
                )));
            }
            if seed.quantity < 0 {
                return Err(DomainError::validation(
                    "items.quantity",
                    format!("quantity of `{label}` cannot be negative"),
                ));
            }
            items.push(ItemSeed {
                item_id: seed.item_id,
                variant: Variant {
                    label,
                    ..seed.variant.clone()
                },
                quantity: seed.quantity,
            });
        }
        checked_total(items.iter().map(|i| i.quantity), "items.quantity")?;

        Ok(vec![InventoryEvent::RecordRegistered(RecordRegistered {
            record_id: cmd.record_id,
            origin: cmd.origin,
            details: ProductDetails {
                product_name,
                sku: normalized(cmd.details.sku.as_deref()),
                notes: normalized(cmd.details.notes.as_deref()),
            },
            items,
            registered_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveRecord) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        self.ensure_status(InventoryStatus::Incoming, "receive")?;

        if let Some(unknown) = cmd
            .verified_variants
            .iter()
            .find(|label| !self.items.iter().any(|i| &i.variant().label == *label))
        {
            return Err(DomainError::not_found(format!("variant `{unknown}`")));
        }

        let verifications = self
            .items
            .iter()
            .map(|item| ItemVerification {
                item_id: item.id(),
                verified: cmd.verified_variants.contains(&item.variant().label),
            })
            .collect();

        Ok(vec![InventoryEvent::RecordReceived(RecordReceived {
            record_id: cmd.record_id,
            rack_location: normalized(Some(&cmd.rack_location)),
            verifications,
            received_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_media(&self, cmd: &AttachMedia) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        if cmd.media.is_empty() {
            return Err(DomainError::validation("media", "no media to attach"));
        }

        Ok(vec![InventoryEvent::MediaAttached(MediaAttached {
            record_id: cmd.record_id,
            media: cmd.media.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_detach_media(&self, cmd: &DetachMedia) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        let media = self
            .media
            .iter()
            .find(|m| m.id == cmd.media_id)
            .ok_or_else(|| DomainError::not_found(format!("media {}", cmd.media_id)))?;

        Ok(vec![InventoryEvent::MediaDetached(MediaDetached {
            record_id: cmd.record_id,
            media_id: cmd.media_id,
            url: media.url.clone(),
            detached_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_relocate(&self, cmd: &RelocateRecord) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        self.ensure_status(InventoryStatus::InStock, "relocate")?;

        Ok(vec![InventoryEvent::RecordRelocated(RecordRelocated {
            record_id: cmd.record_id,
            rack_location: normalized(Some(&cmd.rack_location)),
            notes: normalized(cmd.notes.as_deref()),
            relocated_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_transaction(
        &self,
        cmd: &RecordTransaction,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        self.ensure_status(InventoryStatus::InStock, "change quantities of")?;

        let item = self
            .item(cmd.item_id)
            .ok_or_else(|| DomainError::not_found(format!("inventory item {}", cmd.item_id)))?;
        let change = item.plan_change(cmd.transaction_type, cmd.quantity)?;
        checked_total(
            self.items
                .iter()
                .map(|i| if i.id() == cmd.item_id { change.after } else { i.expected_quantity() }),
            "quantity",
        )?;

        Ok(vec![InventoryEvent::TransactionRecorded(TransactionRecorded {
            record_id: cmd.record_id,
            transaction: InventoryTransaction {
                id: cmd.transaction_id,
                item_id: cmd.item_id,
                transaction_type: cmd.transaction_type,
                quantity_change: change.change,
                quantity_before: change.before,
                quantity_after: change.after,
                actor_id: cmd.actor.id,
                actor_name: cmd.actor.name.trim().to_string(),
                counterpart_name: normalized(cmd.counterpart_name.as_deref()),
                notes: normalized(cmd.notes.as_deref()),
                created_at: cmd.occurred_at,
            },
        })])
    }

    fn handle_pick_up(&self, cmd: &PickUpRecord) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        self.ensure_status(InventoryStatus::InStock, "pick up")?;
        let picked_up_by = required("picked_up_by", &cmd.picked_up_by, "picked up by")?;

        Ok(vec![InventoryEvent::RecordPickedUp(RecordPickedUp {
            record_id: cmd.record_id,
            picked_up_by,
            archived_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unarchive(&self, cmd: &UnarchiveRecord) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        self.ensure_status(InventoryStatus::Archived, "unarchive")?;

        Ok(vec![InventoryEvent::RecordUnarchived(RecordUnarchived {
            record_id: cmd.record_id,
            unarchived_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteRecord) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;

        Ok(vec![InventoryEvent::RecordDeleted(RecordDeleted {
            record_id: cmd.record_id,
            media_urls: self.media.iter().map(|m| m.url.clone()).collect(),
            deleted_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Decide a full or partial pickup.
    ///
    /// A partial pickup yields events for two streams: the split audit entry
    /// reducing this record, and the creation of the archived record. New item
    /// ids for the archived record are minted here.
    pub fn decide_pickup(&self, cmd: &RequestPickup) -> DomainResult<PickupDecision> {
        self.ensure_target(cmd.record_id, &cmd.actor)?;
        self.ensure_status(InventoryStatus::InStock, "pick up")?;
        let picked_up_by = required("picked_up_by", &cmd.picked_up_by, "picked up by")?;

        let total = self.total_quantity()?;
        if cmd.quantity <= 0 || cmd.quantity > total {
            return Err(DomainError::validation(
                "pickup_quantity",
                format!("pickup quantity must be between 1 and {total}"),
            ));
        }

        if cmd.quantity == total {
            let events = self.handle_pick_up(&PickUpRecord {
                record_id: cmd.record_id,
                picked_up_by,
                actor: cmd.actor.clone(),
                occurred_at: cmd.occurred_at,
            })?;
            return Ok(PickupDecision::Full(events));
        }

        if cmd.archived_record_id == self.id {
            return Err(DomainError::invariant(
                "archived record id must differ from the source record",
            ));
        }

        let plan = SplitPlan::compute(&self.items, cmd.quantity)?;

        let split = PartialPickupSplit {
            record_id: self.id,
            archived_record_id: cmd.archived_record_id,
            picked_up_quantity: plan.pickup_quantity,
            remaining_quantity: plan.remainder(),
            drift: plan.drift(),
            lines: plan.lines.clone(),
            picked_up_by: picked_up_by.clone(),
            split_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        };

        let archived = SplitArchived {
            record_id: cmd.archived_record_id,
            source_record_id: self.id,
            origin: self.origin,
            details: self.details.clone(),
            rack_location: self.rack_location.clone(),
            received_at: self.received_at,
            received_by: self.received_by,
            items: plan
                .lines
                .iter()
                .map(|line| ItemSeed {
                    item_id: InventoryItemId::generate(),
                    variant: line.variant.clone(),
                    quantity: line.archived_quantity,
                })
                .collect(),
            picked_up_by,
            archived_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        };

        Ok(PickupDecision::Split(PickupFork {
            plan,
            source_events: vec![InventoryEvent::PartialPickupSplit(split)],
            archived_record_id: cmd.archived_record_id,
            archived_events: vec![InventoryEvent::SplitArchived(archived)],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockroom_core::Role;
    use stockroom_events::execute;

    fn actor() -> Actor {
        Actor::new(UserId::new(), "Dana Ortiz", Role::Warehouse)
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn seed(label: &str, quantity: i64) -> ItemSeed {
        ItemSeed {
            item_id: InventoryItemId::generate(),
            variant: Variant::new(label),
            quantity,
        }
    }

    fn registered(items: Vec<ItemSeed>) -> InventoryRecord {
        let id = InventoryId::generate();
        let mut record = InventoryRecord::empty(id);
        execute(
            &mut record,
            &InventoryCommand::Register(RegisterRecord {
                record_id: id,
                origin: None,
                details: ProductDetails {
                    product_name: "Crew hoodie".to_string(),
                    sku: Some("HD-01".to_string()),
                    notes: None,
                },
                items,
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        record
    }

    fn in_stock(items: Vec<ItemSeed>) -> InventoryRecord {
        let mut record = registered(items);
        let id = record.id_typed();
        execute(
            &mut record,
            &InventoryCommand::Receive(ReceiveRecord {
                record_id: id,
                rack_location: "A-3".to_string(),
                verified_variants: BTreeSet::new(),
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        record
    }

    fn transact(
        record: &mut InventoryRecord,
        item_id: InventoryItemId,
        transaction_type: TransactionType,
        quantity: i64,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        let id = record.id_typed();
        execute(
            record,
            &InventoryCommand::RecordTransaction(RecordTransaction {
                record_id: id,
                item_id,
                transaction_id: TransactionId::new(),
                transaction_type,
                quantity,
                counterpart_name: Some("  Sam (driver) ".to_string()),
                notes: Some(String::new()),
                actor: actor(),
                occurred_at: now(),
            }),
        )
    }

    fn pickup_request(record: &InventoryRecord, quantity: i64, by: &str) -> RequestPickup {
        RequestPickup {
            record_id: record.id_typed(),
            archived_record_id: InventoryId::generate(),
            quantity,
            picked_up_by: by.to_string(),
            actor: actor(),
            occurred_at: now(),
        }
    }

    #[test]
    fn registration_rejects_a_total_that_overflows() {
        let id = InventoryId::generate();
        let record = InventoryRecord::empty(id);
        let half = i64::MAX / 2 + 1;
        let err = record
            .handle(&InventoryCommand::Register(RegisterRecord {
                record_id: id,
                origin: None,
                details: ProductDetails {
                    product_name: "Crew hoodie".to_string(),
                    ..ProductDetails::default()
                },
                items: vec![seed("S", half), seed("M", half)],
                actor: actor(),
                occurred_at: now(),
            }))
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "items.quantity"));
    }

    #[test]
    fn restock_that_would_overflow_the_record_total_is_rejected() {
        let mut record = in_stock(vec![seed("S", i64::MAX - 10), seed("M", 5)]);
        let m = record.items()[1].id();

        let err = transact(&mut record, m, TransactionType::Restock, 20).unwrap_err();

        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "quantity"));
        assert_eq!(record.item(m).map(|i| i.expected_quantity()), Some(5));
        assert_eq!(record.total_quantity().unwrap(), i64::MAX - 5);
    }

    #[test]
    fn receive_moves_incoming_to_in_stock_with_verification() {
        let mut record = registered(vec![seed("S", 10), seed("M", 20)]);
        let id = record.id_typed();
        assert_eq!(record.status(), InventoryStatus::Incoming);

        execute(
            &mut record,
            &InventoryCommand::Receive(ReceiveRecord {
                record_id: id,
                rack_location: "  B-12 ".to_string(),
                verified_variants: BTreeSet::from(["M".to_string()]),
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        assert_eq!(record.status(), InventoryStatus::InStock);
        assert_eq!(record.rack_location(), Some("B-12"));
        assert!(record.received_at().is_some());
        let verified: Vec<(String, bool)> = record
            .items()
            .iter()
            .map(|i| (i.variant().label.clone(), i.verified()))
            .collect();
        assert_eq!(
            verified,
            vec![("S".to_string(), false), ("M".to_string(), true)]
        );
        assert!(record.items()[1].verified_at().is_some());
        record.check_invariants().unwrap();
    }

    #[test]
    fn receive_rejects_unknown_variant_and_second_receipt() {
        let record = registered(vec![seed("S", 1)]);
        let cmd = ReceiveRecord {
            record_id: record.id_typed(),
            rack_location: String::new(),
            verified_variants: BTreeSet::from(["XL".to_string()]),
            actor: actor(),
            occurred_at: now(),
        };
        let err = record.handle(&InventoryCommand::Receive(cmd)).unwrap_err();
        assert_eq!(err, DomainError::not_found("variant `XL`"));

        let stocked = in_stock(vec![seed("S", 1)]);
        let again = ReceiveRecord {
            record_id: stocked.id_typed(),
            rack_location: String::new(),
            verified_variants: BTreeSet::new(),
            actor: actor(),
            occurred_at: now(),
        };
        let err = stocked
            .handle(&InventoryCommand::Receive(again))
            .unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn empty_rack_location_is_stored_as_unset() {
        let mut record = registered(vec![seed("S", 1)]);
        let id = record.id_typed();
        execute(
            &mut record,
            &InventoryCommand::Receive(ReceiveRecord {
                record_id: id,
                rack_location: "   ".to_string(),
                verified_variants: BTreeSet::new(),
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        assert_eq!(record.rack_location(), None);
    }

    #[test]
    fn register_validates_product_and_variants() {
        let id = InventoryId::generate();
        let record = InventoryRecord::empty(id);
        let mut cmd = RegisterRecord {
            record_id: id,
            origin: None,
            details: ProductDetails {
                product_name: " ".to_string(),
                ..ProductDetails::default()
            },
            items: vec![seed("S", 1)],
            actor: actor(),
            occurred_at: now(),
        };
        let err = record
            .handle(&InventoryCommand::Register(cmd.clone()))
            .unwrap_err();
        assert_eq!(err.field(), Some("product_name"));

        cmd.details.product_name = "Tee".to_string();
        cmd.items = vec![seed("S", 1), seed("S", 2)];
        let err = record
            .handle(&InventoryCommand::Register(cmd.clone()))
            .unwrap_err();
        assert_eq!(err.field(), Some("items.variant"));

        cmd.items = vec![seed("S", -1)];
        let err = record.handle(&InventoryCommand::Register(cmd)).unwrap_err();
        assert_eq!(err.field(), Some("items.quantity"));
    }

    #[test]
    fn second_record_for_order_line_is_a_constraint_error() {
        let link = OrderLink {
            order_product_id: OrderProductId::new(),
            order_id: OrderId::new(),
            client_id: None,
        };
        let id = InventoryId::for_order_product(link.order_product_id);
        let mut record = InventoryRecord::empty(id);
        let cmd = RegisterRecord {
            record_id: id,
            origin: Some(link),
            details: ProductDetails {
                product_name: "Cap".to_string(),
                ..ProductDetails::default()
            },
            items: vec![seed("One size", 40)],
            actor: actor(),
            occurred_at: now(),
        };
        execute(&mut record, &InventoryCommand::Register(cmd.clone())).unwrap();

        let err = record
            .handle(&InventoryCommand::Register(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Constraint(_)));
    }

    #[test]
    fn ledger_pickup_beyond_quantity_leaves_item_unchanged() {
        let mut record = in_stock(vec![seed("S", 3)]);
        let item_id = record.items()[0].id();
        let before = record.clone();

        let err = transact(&mut record, item_id, TransactionType::Pickup, 5).unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
        assert_eq!(record, before);
        assert_eq!(record.items()[0].expected_quantity(), 3);
    }

    #[test]
    fn transactions_update_quantity_and_history_is_newest_first() {
        let mut record = in_stock(vec![seed("S", 10)]);
        let item_id = record.items()[0].id();

        transact(&mut record, item_id, TransactionType::Pickup, 4).unwrap();
        transact(&mut record, item_id, TransactionType::Restock, 2).unwrap();

        let item = record.item(item_id).unwrap();
        assert_eq!(item.expected_quantity(), 8);
        let history: Vec<(TransactionType, i64, i64)> = item
            .history()
            .map(|t| (t.transaction_type, t.quantity_before, t.quantity_after))
            .collect();
        assert_eq!(
            history,
            vec![
                (TransactionType::Restock, 6, 8),
                (TransactionType::Pickup, 10, 6),
            ]
        );
        let first = item.history().last().unwrap();
        assert_eq!(first.counterpart_name.as_deref(), Some("Sam (driver)"));
        assert_eq!(first.notes, None);
        assert_eq!(item.history().count(), 2);
        record.check_invariants().unwrap();
    }

    #[test]
    fn transactions_require_in_stock_and_known_item() {
        let mut incoming = registered(vec![seed("S", 10)]);
        let item_id = incoming.items()[0].id();
        let err = transact(&mut incoming, item_id, TransactionType::Pickup, 1).unwrap_err();
        assert_eq!(err.field(), Some("status"));

        let mut stocked = in_stock(vec![seed("S", 10)]);
        let err =
            transact(&mut stocked, InventoryItemId::generate(), TransactionType::Restock, 1)
                .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn full_pickup_requires_a_name_and_keeps_quantities() {
        let mut record = in_stock(vec![seed("S", 10), seed("M", 20)]);
        let id = record.id_typed();

        let blank = PickUpRecord {
            record_id: id,
            picked_up_by: "  ".to_string(),
            actor: actor(),
            occurred_at: now(),
        };
        let err = record
            .handle(&InventoryCommand::PickUp(blank))
            .unwrap_err();
        assert_eq!(err.field(), Some("picked_up_by"));

        execute(
            &mut record,
            &InventoryCommand::PickUp(PickUpRecord {
                record_id: id,
                picked_up_by: "Acme Logistics".to_string(),
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        assert_eq!(record.status(), InventoryStatus::Archived);
        assert_eq!(record.picked_up_by(), Some("Acme Logistics"));
        assert!(record.archived_at().is_some());
        assert_eq!(record.total_quantity().unwrap(), 30);
        record.check_invariants().unwrap();
    }

    #[test]
    fn pickup_of_whole_total_is_a_full_pickup() {
        let record = in_stock(vec![seed("S", 10), seed("M", 20)]);
        let decision = record
            .decide_pickup(&pickup_request(&record, 30, "Acme"))
            .unwrap();
        match decision {
            PickupDecision::Full(events) => {
                assert!(matches!(events[0], InventoryEvent::RecordPickedUp(_)))
            }
            PickupDecision::Split(_) => panic!("expected a full pickup"),
        }

        for bad in [0, 31] {
            let err = record
                .decide_pickup(&pickup_request(&record, bad, "Acme"))
                .unwrap_err();
            assert_eq!(err.field(), Some("pickup_quantity"));
        }
    }

    #[test]
    fn partial_pickup_forks_an_archived_record() {
        let mut source = in_stock(vec![seed("S", 10), seed("M", 20)]);
        let request = pickup_request(&source, 9, "Jordan / Northwind");

        let fork = match source.decide_pickup(&request).unwrap() {
            PickupDecision::Split(fork) => fork,
            PickupDecision::Full(_) => panic!("expected a split"),
        };

        for ev in &fork.source_events {
            source.apply(ev);
        }
        let mut archived = InventoryRecord::empty(fork.archived_record_id);
        for ev in &fork.archived_events {
            archived.apply(ev);
        }

        let remaining: Vec<i64> = source.items().iter().map(|i| i.expected_quantity()).collect();
        let taken: Vec<i64> = archived.items().iter().map(|i| i.expected_quantity()).collect();
        assert_eq!(remaining, vec![7, 14]);
        assert_eq!(taken, vec![3, 6]);
        assert_eq!(source.total_quantity().unwrap(), 21);
        assert_eq!(archived.total_quantity().unwrap(), 9);

        assert_eq!(source.status(), InventoryStatus::InStock);
        assert_eq!(archived.status(), InventoryStatus::Archived);
        assert_eq!(archived.split_from(), Some(source.id_typed()));
        assert_eq!(archived.rack_location(), Some("A-3"));
        assert_eq!(archived.details(), source.details());
        assert_eq!(archived.received_at(), source.received_at());
        assert_eq!(archived.picked_up_by(), Some("Jordan / Northwind"));

        let audit = &source.splits()[0];
        assert_eq!(audit.picked_up_quantity, 9);
        assert_eq!(audit.remaining_quantity, 21);
        assert_eq!(audit.archived_record_id, archived.id_typed());
        // Structural split: item ledgers stay empty.
        assert!(source.items().iter().all(|i| i.transaction_count() == 0));

        source.check_invariants().unwrap();
        archived.check_invariants().unwrap();
    }

    #[test]
    fn unarchive_clears_archive_fields() {
        let mut record = in_stock(vec![seed("S", 2)]);
        let id = record.id_typed();
        execute(
            &mut record,
            &InventoryCommand::PickUp(PickUpRecord {
                record_id: id,
                picked_up_by: "Acme".to_string(),
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        execute(
            &mut record,
            &InventoryCommand::Unarchive(UnarchiveRecord {
                record_id: id,
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        assert_eq!(record.status(), InventoryStatus::InStock);
        assert_eq!(record.archived_at(), None);
        assert_eq!(record.picked_up_by(), None);
        assert_eq!(record.total_quantity().unwrap(), 2);

        let err = record
            .handle(&InventoryCommand::Unarchive(UnarchiveRecord {
                record_id: id,
                actor: actor(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn deleted_record_rejects_commands() {
        let mut record = in_stock(vec![seed("S", 2)]);
        let id = record.id_typed();
        execute(
            &mut record,
            &InventoryCommand::Delete(DeleteRecord {
                record_id: id,
                actor: actor(),
                occurred_at: now(),
            }),
        )
        .unwrap();

        assert!(record.is_deleted());
        assert!(record.items().is_empty());
        let err = record
            .decide_pickup(&pickup_request(&record, 1, "Acme"))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let record = in_stock(vec![seed("S", 5)]);
        let snapshot = record.clone();
        let cmd = InventoryCommand::PickUp(PickUpRecord {
            record_id: record.id_typed(),
            picked_up_by: "Acme".to_string(),
            actor: actor(),
            occurred_at: now(),
        });

        let first = record.handle(&cmd).unwrap();
        let second = record.handle(&cmd).unwrap();
        assert_eq!(first, second);
        assert_eq!(record, snapshot);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of ledger requests keeps every item's
        /// quantity equal to its newest ledger entry and non-negative.
        #[test]
        fn ledger_sequences_preserve_invariants(
            start in 0i64..50,
            ops in prop::collection::vec((0usize..4, 1i64..30), 1..40),
        ) {
            let mut record = in_stock(vec![seed("S", start)]);
            let item_id = record.items()[0].id();

            for (kind, quantity) in ops {
                let before = record.items()[0].expected_quantity();
                let tx_type = TransactionType::ALL[kind];
                match transact(&mut record, item_id, tx_type, quantity) {
                    Ok(_) => {
                        prop_assert_eq!(
                            record.items()[0].expected_quantity(),
                            before + tx_type.signed_delta(quantity)
                        );
                    }
                    Err(_) => prop_assert_eq!(record.items()[0].expected_quantity(), before),
                }
                prop_assert!(record.check_invariants().is_ok());
                prop_assert!(record.items()[0].history().all(|t| t.is_consistent()));
            }
        }
    }
}
