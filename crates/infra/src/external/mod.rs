//! External collaborators and their in-memory adapters.
//!
//! Each collaborator is a trait the services depend on. The in-memory
//! adapters back tests and local development and can be told to fail.

pub mod media;
pub mod notifications;
pub mod orders;
pub mod users;

use thiserror::Error;

pub use media::{FailedUpload, InMemoryMediaStore, MediaStore, MediaUpload, UploadReport, upload_all};
pub use notifications::{ArrivalNotice, InMemoryNotifier, NotificationService, SentNotice};
pub use orders::{InMemoryOrderGateway, OrderGateway};
pub use users::{InMemoryUserDirectory, Recipient, UserDirectory};

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("{0} not found")]
    NotFound(String),
}
