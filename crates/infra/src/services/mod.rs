//! Application services over the inventory streams and the order side.

pub mod inventory_service;
pub mod order_sync;

pub use inventory_service::{
    Collaborators, DeleteOutcome, DetachOutcome, InventoryService, MediaOutcome, NewRecord,
    NewVariant, NotificationOutcome, OrderSyncOutcome, PickupOutcome, PickupRequest,
    ReceiveOutcome, ReceiveRequest, ReceiveTarget, TransactionRequest,
};
pub use order_sync::OrderSync;
