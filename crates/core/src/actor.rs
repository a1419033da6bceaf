//! Explicit actor context passed into every lifecycle and ledger operation.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::UserId;

/// Role of the user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Warehouse,
    Staff,
    Manufacturer,
    Client,
}

impl Role {
    /// Admin-class users receive warehouse arrival notifications.
    pub fn is_admin_class(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    /// Actors must carry a display name; it is written into audit fields.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("actor.name", "actor name is required"));
        }
        Ok(())
    }
}
