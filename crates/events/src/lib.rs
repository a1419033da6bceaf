//! Domain event contracts shared by the warehouse aggregates.

pub mod event;
pub mod handler;

pub use event::Event;
pub use handler::execute;
