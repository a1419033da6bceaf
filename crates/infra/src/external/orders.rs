use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use stockroom_core::{AggregateId, ClientId, OrderId, OrderProductId};
use stockroom_inventory::{OrderLink, ProductDetails, ShippedProduct, ShippedVariant};
use stockroom_orders::{Order, OrderProduct, OrderStatus, ProductStatus, ReportedStatus};

use super::CollaboratorError;

/// Read/write access to the order side.
pub trait OrderGateway: Send + Sync {
    /// Non-deleted lines currently in `shipped` state.
    fn shipped_products(&self) -> Result<Vec<ShippedProduct>, CollaboratorError>;

    /// All lines of an order, including deleted ones.
    fn order_products(&self, order_id: OrderId) -> Result<Vec<OrderProduct>, CollaboratorError>;

    fn set_product_status(
        &self,
        order_product_id: OrderProductId,
        status: ProductStatus,
    ) -> Result<(), CollaboratorError>;

    /// Mark a line `delivered` and link it to its inventory record, in one write.
    fn mark_received(
        &self,
        order_product_id: OrderProductId,
        inventory_record_id: AggregateId,
        received_at: DateTime<Utc>,
    ) -> Result<(), CollaboratorError>;

    fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone)]
struct GatewayLine {
    product: OrderProduct,
    details: ProductDetails,
    variants: Vec<ShippedVariant>,
    shipped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct GatewayState {
    orders: HashMap<OrderId, Order>,
    lines: Vec<GatewayLine>,
}

/// In-memory order side for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderGateway {
    state: RwLock<GatewayState>,
    fail_product_writes: AtomicBool,
    fail_order_writes: AtomicBool,
}

impl InMemoryOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(&self, client_id: Option<ClientId>) -> OrderId {
        let id = OrderId::new();
        if let Ok(mut state) = self.state.write() {
            state.orders.insert(
                id,
                Order {
                    id,
                    client_id,
                    status: OrderStatus::Draft,
                    updated_at: None,
                },
            );
        }
        id
    }

    pub fn add_line(
        &self,
        order_id: OrderId,
        details: ProductDetails,
        variants: Vec<ShippedVariant>,
        status: ProductStatus,
    ) -> OrderProductId {
        let id = OrderProductId::new();
        if let Ok(mut state) = self.state.write() {
            let shipped_at = (status == ProductStatus::Shipped).then(Utc::now);
            state.lines.push(GatewayLine {
                product: OrderProduct {
                    id,
                    order_id,
                    product_name: details.product_name.clone(),
                    product_status: status.as_str().to_string(),
                    deleted: false,
                    inventory_record_id: None,
                    warehouse_received_at: None,
                },
                details,
                variants,
                shipped_at,
            });
        }
        id
    }

    /// Store a raw status string, which may fall outside the vocabulary.
    pub fn set_raw_status(&self, order_product_id: OrderProductId, raw: &str) {
        if let Ok(mut state) = self.state.write() {
            if let Some(line) = state.lines.iter_mut().find(|l| l.product.id == order_product_id) {
                line.product.product_status = raw.to_string();
            }
        }
    }

    pub fn delete_line(&self, order_product_id: OrderProductId) {
        if let Ok(mut state) = self.state.write() {
            if let Some(line) = state.lines.iter_mut().find(|l| l.product.id == order_product_id) {
                line.product.deleted = true;
            }
        }
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.state.read().ok()?.orders.get(&order_id).cloned()
    }

    pub fn product(&self, order_product_id: OrderProductId) -> Option<OrderProduct> {
        self.state
            .read()
            .ok()?
            .lines
            .iter()
            .find(|l| l.product.id == order_product_id)
            .map(|l| l.product.clone())
    }

    pub fn fail_product_writes(&self, fail: bool) {
        self.fail_product_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_order_writes(&self, fail: bool) {
        self.fail_order_writes.store(fail, Ordering::SeqCst);
    }

    fn check_product_writes(&self) -> Result<(), CollaboratorError> {
        if self.fail_product_writes.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("order product write failed".to_string()));
        }
        Ok(())
    }

    fn with_line<T>(
        &self,
        order_product_id: OrderProductId,
        f: impl FnOnce(&mut GatewayLine) -> T,
    ) -> Result<T, CollaboratorError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.product.id == order_product_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("order product {order_product_id}")))?;
        Ok(f(line))
    }
}

impl OrderGateway for InMemoryOrderGateway {
    fn shipped_products(&self) -> Result<Vec<ShippedProduct>, CollaboratorError> {
        let state = self
            .state
            .read()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        Ok(state
            .lines
            .iter()
            .filter(|l| !l.product.deleted)
            .filter(|l| l.product.reported_status() == ReportedStatus::Known(ProductStatus::Shipped))
            .map(|l| ShippedProduct {
                link: OrderLink {
                    order_product_id: l.product.id,
                    order_id: l.product.order_id,
                    client_id: state.orders.get(&l.product.order_id).and_then(|o| o.client_id),
                },
                details: l.details.clone(),
                variants: l.variants.clone(),
                shipped_at: l.shipped_at,
            })
            .collect())
    }

    fn order_products(&self, order_id: OrderId) -> Result<Vec<OrderProduct>, CollaboratorError> {
        let state = self
            .state
            .read()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        if !state.orders.contains_key(&order_id) {
            return Err(CollaboratorError::NotFound(format!("order {order_id}")));
        }
        Ok(state
            .lines
            .iter()
            .filter(|l| l.product.order_id == order_id)
            .map(|l| l.product.clone())
            .collect())
    }

    fn set_product_status(
        &self,
        order_product_id: OrderProductId,
        status: ProductStatus,
    ) -> Result<(), CollaboratorError> {
        self.check_product_writes()?;
        self.with_line(order_product_id, |line| {
            line.product.product_status = status.as_str().to_string();
            if status == ProductStatus::Shipped {
                line.shipped_at = Some(Utc::now());
            }
        })
    }

    fn mark_received(
        &self,
        order_product_id: OrderProductId,
        inventory_record_id: AggregateId,
        received_at: DateTime<Utc>,
    ) -> Result<(), CollaboratorError> {
        self.check_product_writes()?;
        self.with_line(order_product_id, |line| {
            line.product.product_status = ProductStatus::Delivered.as_str().to_string();
            line.product.inventory_record_id = Some(inventory_record_id);
            line.product.warehouse_received_at = Some(received_at);
        })
    }

    fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), CollaboratorError> {
        if self.fail_order_writes.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("order write failed".to_string()));
        }
        let mut state = self
            .state
            .write()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("order {order_id}")))?;
        order.status = status;
        order.updated_at = Some(Utc::now());
        Ok(())
    }
}
