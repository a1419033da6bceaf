//! Inventory domain module (event-sourced).
//!
//! Business rules for warehouse inventory records, their variants and the
//! per-variant quantity ledger, implemented purely as deterministic domain
//! logic (no IO, no storage).

pub mod incoming;
pub mod item;
pub mod media;
pub mod record;
pub mod split;
pub mod status;
pub mod transaction;

pub use incoming::{
    IncomingRecord, ShippedProduct, ShippedVariant, VirtualRecord, derive_virtual_records,
};
pub use item::{InventoryItem, InventoryItemId, SplitBaseline, Variant, checked_total};
pub use media::{InventoryMedia, MediaKind};
pub use record::{
    AttachMedia, DeleteRecord, DetachMedia, InventoryCommand, InventoryEvent, InventoryId,
    InventoryRecord, ItemSeed, ItemVerification, MediaAttached, MediaDetached, OrderLink,
    PartialPickupSplit, PickUpRecord, PickupDecision, PickupFork, ProductDetails, ReceiveRecord,
    RecordDeleted, RecordPickedUp, RecordReceived, RecordRegistered, RecordRelocated,
    RecordTransaction, RecordUnarchived, RegisterRecord, RelocateRecord, RequestPickup,
    SplitArchived, TransactionRecorded, UnarchiveRecord,
};
pub use split::{SplitLine, SplitPlan};
pub use status::InventoryStatus;
pub use transaction::{InventoryTransaction, QuantityChange, TransactionType};
