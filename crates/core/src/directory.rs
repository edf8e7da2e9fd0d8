//! Identity & Role Directory
//!
//! Login, signup and session issuance live in an external identity
//! provider. This module only describes what the payment workflow consumes
//! from it: resolving a credential to a caller, and looking up a user.
//!
//! `InMemoryDirectory` backs tests and the development server; it can be
//! seeded from a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// Errors from the directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read directory seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid directory seed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// A user record as exposed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub phone_number: Option<String>,
    pub full_name: String,
    pub is_active: bool,
    pub role: Role,
}

impl UserRecord {
    /// Whether this user can receive disbursements
    pub fn is_eligible_recipient(&self) -> bool {
        self.is_active && self.role == Role::Member
    }
}

/// Read-only view of the external identity provider
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a credential (bearer token) to a caller
    async fn resolve_caller(&self, credential: &str) -> Result<Option<Caller>, DirectoryError>;

    /// Look up a user by ID
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, DirectoryError>;
}

/// One entry of a directory seed file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub role: Role,
    /// Bearer token the user authenticates with
    #[serde(default)]
    pub token: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    users: Vec<SeedUser>,
}

/// In-memory directory
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    tokens: RwLock<HashMap<String, String>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Load a directory from a JSON seed file: `{"users": [...]}`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a directory from seed JSON
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let seed: SeedFile = serde_json::from_str(json)?;
        let directory = Self::new();
        for user in seed.users {
            directory.insert(user);
        }
        Ok(directory)
    }

    /// Add or replace a user
    pub fn insert(&self, seed: SeedUser) {
        let record = UserRecord {
            id: seed.id.clone(),
            phone_number: seed.phone_number,
            full_name: seed.full_name,
            is_active: seed.is_active,
            role: seed.role,
        };

        if let Some(token) = seed.token {
            self.tokens
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(token, seed.id.clone());
        }

        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(seed.id, record);
    }

    /// Convenience for tests: add an active user with a token equal to its ID
    pub fn add_user(&self, id: &str, full_name: &str, phone_number: Option<&str>, role: Role) {
        self.insert(SeedUser {
            id: id.to_string(),
            full_name: full_name.to_string(),
            phone_number: phone_number.map(|p| p.to_string()),
            is_active: true,
            role,
            token: Some(id.to_string()),
        });
    }

    /// Mark a user inactive
    pub fn deactivate(&self, user_id: &str) {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = users.get_mut(user_id) {
            record.is_active = false;
        }
    }

    /// Number of known users
    pub fn user_count(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn resolve_caller(&self, credential: &str) -> Result<Option<Caller>, DirectoryError> {
        let user_id = {
            let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
            match tokens.get(credential) {
                Some(id) => id.clone(),
                None => return Ok(None),
            }
        };

        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users
            .get(&user_id)
            .filter(|record| record.is_active)
            .map(|record| Caller::new(record.id.clone(), record.role)))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"{
        "users": [
            {"id": "u-treasurer", "fullName": "Tina Treasurer", "role": "treasurer", "token": "tok-t"},
            {"id": "u-member", "fullName": "Mussa Member", "phoneNumber": "0754 123 456", "role": "member"},
            {"id": "u-gone", "fullName": "Old Officer", "role": "signatory", "token": "tok-g", "isActive": false}
        ]
    }"#;

    #[tokio::test]
    async fn test_resolve_caller_from_seed() {
        let directory = InMemoryDirectory::from_json(SEED).unwrap();
        assert_eq!(directory.user_count(), 3);

        let caller = directory.resolve_caller("tok-t").await.unwrap().unwrap();
        assert_eq!(caller, Caller::new("u-treasurer", Role::Treasurer));

        assert!(directory.resolve_caller("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let directory = InMemoryDirectory::from_json(SEED).unwrap();
        assert!(directory.resolve_caller("tok-g").await.unwrap().is_none());

        let record = directory.get_user("u-gone").await.unwrap().unwrap();
        assert!(!record.is_active);
        assert_eq!(record.role, Role::Signatory);
    }

    #[tokio::test]
    async fn test_only_active_members_are_eligible_recipients() {
        let directory = InMemoryDirectory::from_json(SEED).unwrap();

        let member = directory.get_user("u-member").await.unwrap().unwrap();
        assert!(member.is_eligible_recipient());

        let officer = directory.get_user("u-treasurer").await.unwrap().unwrap();
        assert!(!officer.is_eligible_recipient());

        directory.deactivate("u-member");
        let member = directory.get_user("u-member").await.unwrap().unwrap();
        assert!(!member.is_eligible_recipient());
    }

    #[tokio::test]
    async fn test_get_user_and_deactivate() {
        let directory = InMemoryDirectory::new();
        directory.add_user("m1", "Member One", Some("0754000111"), Role::Member);

        let record = directory.get_user("m1").await.unwrap().unwrap();
        assert!(record.is_active);
        assert_eq!(record.phone_number.as_deref(), Some("0754000111"));

        directory.deactivate("m1");
        let record = directory.get_user("m1").await.unwrap().unwrap();
        assert!(!record.is_active);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        std::fs::write(&path, SEED).unwrap();

        let directory = InMemoryDirectory::from_file(&path).unwrap();
        assert_eq!(directory.user_count(), 3);

        let missing = InMemoryDirectory::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(DirectoryError::Io(_))));
    }
}
