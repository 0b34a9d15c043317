//! In-memory user directory for testing and development

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::directory::{verify_bcrypt, DirectoryError, Principal, UserDirectory};

struct StoredUser {
    principal: Principal,
    roles: HashSet<String>,
    failed_attempts: u32,
}

/// Directory backed by a map. Secrets are kept as bcrypt hashes.
///
/// Failed secret checks are counted per user but never lock anyone out.
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, StoredUser>>,
    cost: u32,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Use a specific bcrypt cost for hashing added users.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            cost,
        }
    }

    /// Add or replace a user.
    pub fn add_user(
        &self,
        user_name: &str,
        secret: &str,
        roles: &[&str],
    ) -> Result<(), DirectoryError> {
        let password_hash = bcrypt::hash(secret, self.cost)
            .map_err(|e| DirectoryError::Credential(e.to_string()))?;

        let mut users = self.write()?;
        let id = users.len().to_string();
        users.insert(
            user_name.to_string(),
            StoredUser {
                principal: Principal {
                    id,
                    user_name: user_name.to_string(),
                    password_hash,
                },
                roles: roles.iter().map(|r| r.to_string()).collect(),
                failed_attempts: 0,
            },
        );
        Ok(())
    }

    /// Number of failed secret checks recorded for a user.
    pub fn failed_attempts(&self, user_name: &str) -> u32 {
        self.users
            .read()
            .ok()
            .and_then(|users| users.get(user_name).map(|u| u.failed_attempts))
            .unwrap_or(0)
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, StoredUser>>, DirectoryError> {
        self.users
            .write()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, StoredUser>>, DirectoryError> {
        self.users
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory for InMemoryDirectory {
    async fn find_principal(&self, identifier: &str) -> Result<Option<Principal>, DirectoryError> {
        let users = self.read()?;
        Ok(users.get(identifier).map(|u| u.principal.clone()))
    }

    async fn check_secret(
        &self,
        principal: &Principal,
        secret: &str,
    ) -> Result<bool, DirectoryError> {
        let matched = verify_bcrypt(secret, &principal.password_hash).await?;
        if !matched {
            let mut users = self.write()?;
            if let Some(user) = users.get_mut(&principal.user_name) {
                user.failed_attempts += 1;
            }
        }
        Ok(matched)
    }

    async fn has_role(&self, principal: &Principal, role: &str) -> Result<bool, DirectoryError> {
        let users = self.read()?;
        Ok(users
            .get(&principal.user_name)
            .map(|u| u.roles.contains(role))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_find() {
        let directory = InMemoryDirectory::with_cost(4);
        directory.add_user("alice", "s3cr3t", &["API-Access"]).unwrap();

        let found = directory.find_principal("alice").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().user_name, "alice");

        assert!(directory.find_principal("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_attempts_are_tracked_without_lockout() {
        let directory = InMemoryDirectory::with_cost(4);
        directory.add_user("alice", "s3cr3t", &[]).unwrap();
        let alice = directory.find_principal("alice").await.unwrap().unwrap();

        assert!(!directory.check_secret(&alice, "wrong").await.unwrap());
        assert!(!directory.check_secret(&alice, "wrong").await.unwrap());
        assert_eq!(directory.failed_attempts("alice"), 2);

        assert!(directory.check_secret(&alice, "s3cr3t").await.unwrap());
    }

    #[tokio::test]
    async fn test_roles() {
        let directory = InMemoryDirectory::with_cost(4);
        directory
            .add_user("alice", "s3cr3t", &["API-Access", "Reports"])
            .unwrap();
        let alice = directory.find_principal("alice").await.unwrap().unwrap();

        assert!(directory.has_role(&alice, "API-Access").await.unwrap());
        assert!(!directory.has_role(&alice, "Admin").await.unwrap());
    }
}
