//! Service-level errors and how they are shown to users.

use thiserror::Error;

use stockroom_core::DomainError;

use crate::event_store::EventStoreError;
use crate::external::CollaboratorError;
use crate::projections::CatalogProjectionError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// A stale write kept losing to concurrent writers.
    #[error("gave up after {attempts} conflicting attempts: {message}")]
    ConflictRetriesExhausted { attempts: u32, message: String },

    /// Failed to deserialize historical event payloads into the aggregate event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    /// A loaded stream is not a valid history (wrong aggregate, gaps, reordering).
    #[error("corrupt event stream: {0}")]
    CorruptStream(String),

    #[error("{collaborator} failed: {source}")]
    Collaborator {
        collaborator: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error(transparent)]
    Projection(#[from] CatalogProjectionError),
}

/// How an error is presented to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Shown next to the offending input.
    Field { field: String, message: String },
    /// The referenced thing is gone.
    NotFound { message: String },
    /// Generic "something went wrong, try again".
    Retryable { message: String },
}

pub const RETRYABLE_MESSAGE: &str = "Something went wrong while saving. Please try again.";

impl ServiceError {
    pub fn collaborator(collaborator: &'static str, source: CollaboratorError) -> Self {
        Self::Collaborator {
            collaborator,
            source,
        }
    }

    /// Lost an optimistic-concurrency race; reloading and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Store(EventStoreError::Concurrency(_)))
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn surface(&self) -> ErrorSurface {
        match self {
            ServiceError::Domain(DomainError::Validation { field, message }) => ErrorSurface::Field {
                field: field.clone(),
                message: message.clone(),
            },
            ServiceError::Domain(err @ DomainError::NotFound(_)) => ErrorSurface::NotFound {
                message: err.to_string(),
            },
            _ => ErrorSurface::Retryable {
                message: RETRYABLE_MESSAGE.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_surface_at_their_field() {
        let err = ServiceError::from(DomainError::validation("picked_up_by", "picked up by is required"));
        assert_eq!(
            err.surface(),
            ErrorSurface::Field {
                field: "picked_up_by".to_string(),
                message: "picked up by is required".to_string(),
            }
        );
    }

    #[test]
    fn constraint_and_system_errors_are_generic() {
        let constraint = ServiceError::from(DomainError::constraint("duplicate order line"));
        let store = ServiceError::from(EventStoreError::Unavailable("down".to_string()));
        for err in [constraint, store] {
            assert!(matches!(err.surface(), ErrorSurface::Retryable { .. }));
        }
        assert!(ServiceError::from(EventStoreError::Concurrency("stale".to_string())).is_conflict());
    }
}
