//! User directory abstraction
//!
//! The validator only needs three questions answered by whatever stores the
//! users: does the identifier exist, does the secret match, and does the
//! principal hold a role.

use std::fmt;
use std::sync::Arc;

use error::{AuthError, DatabaseError};
use thiserror::Error;

/// Directory errors. None of these mean "bad credentials".
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Directory query failed: {0}")]
    Query(String),

    #[error("Stored credential is unusable: {0}")]
    Credential(String),
}

impl From<DatabaseError> for DirectoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionFailed(msg) => DirectoryError::Unavailable(msg),
            DatabaseError::QueryFailed(msg) => DirectoryError::Query(msg),
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        AuthError::DirectoryUnavailable(err.to_string())
    }
}

/// A user found in the directory.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    /// Directory-internal key
    pub id: String,
    /// Login identifier
    pub user_name: String,
    /// Stored bcrypt hash
    pub password_hash: String,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("user_name", &self.user_name)
            .finish_non_exhaustive()
    }
}

/// Source of principals, secrets and role assignments.
#[allow(async_fn_in_trait)]
pub trait UserDirectory: Send + Sync {
    /// Look up a principal by login identifier
    async fn find_principal(&self, identifier: &str) -> Result<Option<Principal>, DirectoryError>;

    /// Check a secret against the stored credential without starting a session
    async fn check_secret(&self, principal: &Principal, secret: &str)
        -> Result<bool, DirectoryError>;

    /// Check role membership
    async fn has_role(&self, principal: &Principal, role: &str) -> Result<bool, DirectoryError>;
}

impl<D: UserDirectory> UserDirectory for Arc<D> {
    async fn find_principal(&self, identifier: &str) -> Result<Option<Principal>, DirectoryError> {
        (**self).find_principal(identifier).await
    }

    async fn check_secret(
        &self,
        principal: &Principal,
        secret: &str,
    ) -> Result<bool, DirectoryError> {
        (**self).check_secret(principal, secret).await
    }

    async fn has_role(&self, principal: &Principal, role: &str) -> Result<bool, DirectoryError> {
        (**self).has_role(principal, role).await
    }
}

/// Verify `secret` against a bcrypt hash off the async executor.
pub(crate) async fn verify_bcrypt(secret: &str, hash: &str) -> Result<bool, DirectoryError> {
    let secret = secret.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash))
        .await
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))?
        .map_err(|e| DirectoryError::Credential(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_bcrypt() {
        let hash = bcrypt::hash("s3cr3t", 4).unwrap();
        assert!(verify_bcrypt("s3cr3t", &hash).await.unwrap());
        assert!(!verify_bcrypt("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        let result = verify_bcrypt("s3cr3t", "not-a-hash").await;
        assert!(matches!(result, Err(DirectoryError::Credential(_))));
    }

    #[test]
    fn test_directory_errors_become_unavailable() {
        let err: DirectoryError = DatabaseError::ConnectionFailed("refused".to_string()).into();
        let auth: AuthError = err.into();
        assert!(auth.is_infrastructure());
    }

    #[test]
    fn test_principal_debug_hides_hash() {
        let principal = Principal {
            id: "1".to_string(),
            user_name: "alice".to_string(),
            password_hash: "$2b$04$abcdef".to_string(),
        };
        assert!(!format!("{:?}", principal).contains("$2b$"));
    }
}
