//! Infrastructure layer: event store, repositories, read models,
//! external collaborators and the services that compose them.

pub mod config;
pub mod error;
pub mod event_store;
pub mod external;
pub mod projections;
pub mod read_model;
pub mod repository;
pub mod services;

pub use config::StockroomConfig;
pub use error::{ErrorSurface, ServiceError};
