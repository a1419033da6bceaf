//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the inventory and
//! order crates (no infrastructure concerns).

pub mod actor;
pub mod aggregate;
pub mod error;
pub mod id;

pub use actor::{Actor, Role};
pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, ClientId, MediaId, OrderId, OrderProductId, TransactionId, UserId};
