//! Orders domain module.
//!
//! Product and order status vocabularies and the rollup that derives an
//! order's status from its lines. Orders themselves live outside this system;
//! this crate only holds the deterministic rules (no IO).

pub mod order;
pub mod order_status;
pub mod product_status;
pub mod rollup;

pub use order::{Order, OrderProduct};
pub use order_status::OrderStatus;
pub use product_status::{PRECEDENCE, ProductStatus, ReportedStatus, UNKNOWN_STATUS_RANK};
pub use rollup::{RollupDecision, rollup};
