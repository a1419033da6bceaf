use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateId, ClientId, OrderId, OrderProductId};

use crate::order_status::OrderStatus;
use crate::product_status::ReportedStatus;

/// A line of an order, as held by the order side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub id: OrderProductId,
    pub order_id: OrderId,
    pub product_name: String,
    /// Raw status string; may fall outside the known vocabulary.
    pub product_status: String,
    pub deleted: bool,
    /// Set when the line is received into the warehouse.
    pub inventory_record_id: Option<AggregateId>,
    pub warehouse_received_at: Option<DateTime<Utc>>,
}

impl OrderProduct {
    pub fn reported_status(&self) -> ReportedStatus {
        ReportedStatus::parse(&self.product_status)
    }
}

/// Order header. `status` is derived from its lines by the rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: Option<ClientId>,
    pub status: OrderStatus,
    pub updated_at: Option<DateTime<Utc>>,
}
