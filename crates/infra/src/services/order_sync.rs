//! Keeps order lines and order status in step with the warehouse.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use stockroom_core::{OrderId, OrderProductId};
use stockroom_inventory::{InventoryId, OrderLink};
use stockroom_orders::{ProductStatus, RollupDecision, rollup};

use crate::error::ServiceError;
use crate::external::OrderGateway;

/// Writes order-line status and re-runs the rollup for the parent order.
#[derive(Clone)]
pub struct OrderSync {
    orders: Arc<dyn OrderGateway>,
}

impl OrderSync {
    pub fn new(orders: Arc<dyn OrderGateway>) -> Self {
        Self { orders }
    }

    pub fn gateway(&self) -> &dyn OrderGateway {
        self.orders.as_ref()
    }

    /// Mark the line delivered, link it to its record, and roll up the order.
    pub fn mark_delivered(
        &self,
        link: &OrderLink,
        record_id: InventoryId,
        received_at: DateTime<Utc>,
    ) -> Result<Option<RollupDecision>, ServiceError> {
        self.orders
            .mark_received(link.order_product_id, record_id.0, received_at)
            .map_err(|e| ServiceError::collaborator("order gateway", e))?;
        self.recompute(link.order_id)
    }

    /// Change one line's status and roll up its order.
    pub fn change_product_status(
        &self,
        order_id: OrderId,
        order_product_id: OrderProductId,
        status: ProductStatus,
    ) -> Result<Option<RollupDecision>, ServiceError> {
        self.orders
            .set_product_status(order_product_id, status)
            .map_err(|e| ServiceError::collaborator("order gateway", e))?;
        self.recompute(order_id)
    }

    /// Recompute and persist the order status from its current lines.
    ///
    /// Leaves the order untouched when it has no live lines. Safe to re-run.
    pub fn recompute(&self, order_id: OrderId) -> Result<Option<RollupDecision>, ServiceError> {
        let products = self
            .orders
            .order_products(order_id)
            .map_err(|e| ServiceError::collaborator("order gateway", e))?;

        let Some(decision) = rollup(&products) else {
            info!(order_id = %order_id, "order has no live lines; status left unchanged");
            return Ok(None);
        };

        self.orders
            .set_order_status(order_id, decision.status)
            .map_err(|e| ServiceError::collaborator("order gateway", e))?;

        info!(
            order_id = %order_id,
            status = %decision.status,
            driving_status = decision.driving_status.as_str(),
            forced_complete = decision.forced_complete,
            "order status rolled up"
        );
        Ok(Some(decision))
    }
}
