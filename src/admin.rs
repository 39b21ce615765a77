//! Admin records and the configuration-backed credential store.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Back-office role carried as the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Moderator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Moderator => write!(f, "Moderator"),
        }
    }
}

/// Admin/moderator record, read-only to this service.
///
/// Loaded from the `admins` section of `config.yaml`; account management
/// flows that create or delete records live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub admin_id: Uuid,
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    /// False until the mandatory first-login password-set step completes.
    #[serde(default)]
    pub password_chosen: bool,
}

/// Lookup over the configured admin collection.
#[derive(Clone, Default)]
pub struct CredentialStore {
    admins: Arc<Vec<Admin>>,
}

impl CredentialStore {
    /// Create a new [`CredentialStore`].
    pub fn new(admins: Vec<Admin>) -> Self {
        Self {
            admins: Arc::new(admins),
        }
    }

    /// Find an admin by email, case-insensitively.
    pub fn find_by_email(&self, email: &str) -> Option<&Admin> {
        self.admins
            .iter()
            .find(|admin| admin.email.eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str) -> Admin {
        Admin {
            admin_id: Uuid::new_v4(),
            email: email.into(),
            password_hash: String::new(),
            role: Role::Moderator,
            password_chosen: true,
        }
    }

    #[test]
    fn test_find_by_email() {
        let store = CredentialStore::new(vec![
            record("alice@example.com"),
            record("bob@example.com"),
        ]);

        assert!(store.find_by_email("bob@example.com").is_some());
        assert!(store.find_by_email("Bob@Example.COM").is_some());
        assert!(store.find_by_email("carol@example.com").is_none());
    }

    #[test]
    fn test_role_claim_format() {
        assert_eq!(Role::Admin.to_string(), "Admin");
        assert_eq!(Role::Moderator.to_string(), "Moderator");
    }
}
