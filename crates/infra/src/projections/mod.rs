//! Projection implementations (read model builders).
//!
//! Projections consume stored events and build query-optimized read models.
//! All projections are:
//! - **Rebuildable**: Can be reconstructed from the event store
//! - **Idempotent**: Safe for at-least-once delivery

pub mod inventory_catalog;

pub use inventory_catalog::{
    CatalogEntry, CatalogProjectionError, CatalogVariant, InventoryCatalogProjection,
};
