//! Order status rollup.
//!
//! An order's status follows its least advanced line: the line with the lowest
//! precedence rank decides, ties going to the first line encountered. Once
//! every live line is delivered or completed the order is completed.
//!
//! The result depends only on the lines' statuses, so re-running it is always
//! safe.

use stockroom_core::OrderProductId;

use crate::order::OrderProduct;
use crate::order_status::OrderStatus;
use crate::product_status::ReportedStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupDecision {
    pub status: OrderStatus,
    /// Line whose status decided the outcome.
    pub driving_product: OrderProductId,
    pub driving_status: ReportedStatus,
    /// Every live line was delivered or completed.
    pub forced_complete: bool,
}

/// Derive the order status from its lines. Deleted lines are ignored.
///
/// Returns `None` when there are no live lines; the order is then left as is.
pub fn rollup<'a>(products: impl IntoIterator<Item = &'a OrderProduct>) -> Option<RollupDecision> {
    let mut driving: Option<(OrderProductId, ReportedStatus)> = None;
    let mut all_terminal = true;

    for product in products.into_iter().filter(|p| !p.deleted) {
        let status = product.reported_status();
        all_terminal &= status.is_terminal();
        let replace = match &driving {
            Some((_, current)) => status.rank() < current.rank(),
            None => true,
        };
        if replace {
            driving = Some((product.id, status));
        }
    }

    let (driving_product, driving_status) = driving?;
    let status = if all_terminal {
        OrderStatus::Completed
    } else {
        OrderStatus::from_reported(&driving_status)
    };

    Some(RollupDecision {
        status,
        driving_product,
        driving_status,
        forced_complete: all_terminal,
    })
}
