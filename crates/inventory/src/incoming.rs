//! Incoming records that exist only as shipped order lines.
//!
//! A shipped order line with no inventory record yet is offered as a
//! [`VirtualRecord`]. It has no identity of its own until received, at which
//! point it is registered under a stream id derived from its order line.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Actor, DomainResult, OrderProductId};

use crate::item::{InventoryItemId, Variant, checked_total};
use crate::record::{
    InventoryId, InventoryRecord, ItemSeed, OrderLink, ProductDetails, RegisterRecord,
};

/// One variant as reported by the order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippedVariant {
    pub variant: Variant,
    pub quantity: i64,
}

/// An order line in `shipped` state, as read from the order side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippedProduct {
    pub link: OrderLink,
    pub details: ProductDetails,
    pub variants: Vec<ShippedVariant>,
    pub shipped_at: Option<DateTime<Utc>>,
}

/// A shipped line awaiting receipt; not persisted, no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualRecord {
    pub origin: OrderLink,
    pub details: ProductDetails,
    pub variants: Vec<ShippedVariant>,
    pub shipped_at: Option<DateTime<Utc>>,
}

impl VirtualRecord {
    pub fn from_shipped(product: &ShippedProduct) -> Self {
        Self {
            origin: product.link,
            details: product.details.clone(),
            variants: product.variants.clone(),
            shipped_at: product.shipped_at,
        }
    }

    /// Stream id the record receives when it is persisted.
    pub fn record_id(&self) -> InventoryId {
        InventoryId::for_order_product(self.origin.order_product_id)
    }

    pub fn total_quantity(&self) -> DomainResult<i64> {
        checked_total(self.variants.iter().map(|v| v.quantity), "items.quantity")
    }

    /// Registration command that persists this record as `incoming`.
    pub fn registration(&self, actor: Actor, occurred_at: DateTime<Utc>) -> RegisterRecord {
        RegisterRecord {
            record_id: self.record_id(),
            origin: Some(self.origin),
            details: self.details.clone(),
            items: self
                .variants
                .iter()
                .map(|v| ItemSeed {
                    item_id: InventoryItemId::generate(),
                    variant: v.variant.clone(),
                    quantity: v.quantity,
                })
                .collect(),
            actor,
            occurred_at,
        }
    }
}

/// Entry in the incoming list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingRecord {
    Virtual(VirtualRecord),
    Persisted(InventoryRecord),
}

impl IncomingRecord {
    pub fn is_virtual(&self) -> bool {
        matches!(self, IncomingRecord::Virtual(_))
    }

    pub fn product_name(&self) -> &str {
        match self {
            IncomingRecord::Virtual(v) => &v.details.product_name,
            IncomingRecord::Persisted(r) => &r.details().product_name,
        }
    }

    pub fn order_product_id(&self) -> Option<OrderProductId> {
        match self {
            IncomingRecord::Virtual(v) => Some(v.origin.order_product_id),
            IncomingRecord::Persisted(r) => r.origin().map(|o| o.order_product_id),
        }
    }

    pub fn total_quantity(&self) -> DomainResult<i64> {
        match self {
            IncomingRecord::Virtual(v) => v.total_quantity(),
            IncomingRecord::Persisted(r) => r.total_quantity(),
        }
    }
}

/// Shipped lines that still need a virtual record.
///
/// Lines already tracked by a record in any state (including archived) are
/// skipped, as are repeated reports of the same line.
pub fn derive_virtual_records<'a>(
    shipped: impl IntoIterator<Item = &'a ShippedProduct>,
    tracked: &HashSet<OrderProductId>,
) -> Vec<VirtualRecord> {
    let mut seen = HashSet::new();
    shipped
        .into_iter()
        .filter(|p| !tracked.contains(&p.link.order_product_id))
        .filter(|p| seen.insert(p.link.order_product_id))
        .map(VirtualRecord::from_shipped)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{AggregateRoot, OrderId, Role, UserId};
    use stockroom_events::execute;

    use crate::record::InventoryCommand;
    use crate::status::InventoryStatus;

    fn shipped(name: &str) -> ShippedProduct {
        ShippedProduct {
            link: OrderLink {
                order_product_id: OrderProductId::new(),
                order_id: OrderId::new(),
                client_id: None,
            },
            details: ProductDetails {
                product_name: name.to_string(),
                ..ProductDetails::default()
            },
            variants: vec![
                ShippedVariant {
                    variant: Variant::new("S"),
                    quantity: 10,
                },
                ShippedVariant {
                    variant: Variant::new("M"),
                    quantity: 20,
                },
            ],
            shipped_at: Some(Utc::now()),
        }
    }

    #[test]
    fn tracked_and_repeated_lines_are_skipped() {
        let a = shipped("Tee");
        let b = shipped("Hoodie");
        let tracked = HashSet::from([b.link.order_product_id]);

        let virtuals = derive_virtual_records([&a, &b, &a], &tracked);
        assert_eq!(virtuals.len(), 1);
        assert_eq!(virtuals[0].details.product_name, "Tee");
        assert_eq!(virtuals[0].total_quantity().unwrap(), 30);
    }

    #[test]
    fn registration_targets_the_order_line_stream() {
        let line = shipped("Tee");
        let virtual_record = VirtualRecord::from_shipped(&line);
        let actor = Actor::new(UserId::new(), "Dana", Role::Warehouse);

        let mut record = InventoryRecord::empty(virtual_record.record_id());
        let cmd = virtual_record.registration(actor, Utc::now());
        execute(&mut record, &InventoryCommand::Register(cmd)).unwrap();

        assert_eq!(record.status(), InventoryStatus::Incoming);
        assert_eq!(
            record.origin().map(|o| o.order_product_id),
            Some(line.link.order_product_id)
        );
        assert_eq!(record.total_quantity().unwrap(), 30);
        assert!(record.check_invariants().is_ok());

        let entry = IncomingRecord::Persisted(record.clone());
        assert!(!entry.is_virtual());
        assert_eq!(entry.product_name(), "Tee");
        assert_eq!(record.version(), 1);
    }
}
