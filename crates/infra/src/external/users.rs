use std::sync::RwLock;

use stockroom_core::{Role, UserId};

use super::CollaboratorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

/// Source of notification recipients.
pub trait UserDirectory: Send + Sync {
    /// Users with an admin-class role.
    fn admin_recipients(&self) -> Result<Vec<Recipient>, CollaboratorError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<Recipient>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, role: Role) -> UserId {
        let user_id = UserId::new();
        if let Ok(mut users) = self.users.write() {
            users.push(Recipient {
                user_id,
                name: name.into(),
                role,
            });
        }
        user_id
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn admin_recipients(&self) -> Result<Vec<Recipient>, CollaboratorError> {
        let users = self
            .users
            .read()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        Ok(users
            .iter()
            .filter(|u| u.role.is_admin_class())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_class_users_are_recipients() {
        let directory = InMemoryUserDirectory::new();
        let owner = directory.add("Priya", Role::SuperAdmin);
        let admin = directory.add("Lee", Role::Admin);
        directory.add("Sam", Role::Warehouse);
        directory.add("Kai", Role::Client);

        let ids: Vec<UserId> = directory
            .admin_recipients()
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(ids, vec![owner, admin]);
    }
}
