//! Credential validation
//!
//! Existence, secret and role are checked in that order, and the first
//! failing stage ends the check without further directory calls.

use auth::Decline;
use error::AuthError;

use crate::directory::UserDirectory;

/// Role a principal needs before a token is issued.
pub const API_ACCESS_ROLE: &str = "API-Access";

/// Outcome of a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Validated,
    Declined(Decline),
}

/// Checks login attempts against a user directory.
pub struct CredentialValidator<D> {
    directory: D,
}

impl<D: UserDirectory> CredentialValidator<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// True only when the principal exists, the secret matches and the
    /// principal holds [`API_ACCESS_ROLE`].
    pub async fn validate(&self, identifier: &str, secret: &str) -> Result<bool, AuthError> {
        Ok(self.check(identifier, secret).await? == Validation::Validated)
    }

    /// Like [`CredentialValidator::validate`], reporting which stage declined.
    pub async fn check(&self, identifier: &str, secret: &str) -> Result<Validation, AuthError> {
        if identifier.trim().is_empty() {
            tracing::debug!("Declining login with empty identifier");
            return Ok(Validation::Declined(Decline::NotFound));
        }

        let Some(principal) = self.directory.find_principal(identifier).await? else {
            tracing::info!(user = identifier, "Login declined: unknown user");
            return Ok(Validation::Declined(Decline::NotFound));
        };

        if !self.directory.check_secret(&principal, secret).await? {
            tracing::info!(user = identifier, "Login declined: invalid credentials");
            return Ok(Validation::Declined(Decline::Rejected));
        }

        if !self.directory.has_role(&principal, API_ACCESS_ROLE).await? {
            tracing::info!(
                user = identifier,
                role = API_ACCESS_ROLE,
                "Login declined: missing role"
            );
            return Ok(Validation::Declined(Decline::Unauthorized));
        }

        tracing::debug!(user = identifier, "Credentials validated");
        Ok(Validation::Validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;

    fn validator() -> CredentialValidator<InMemoryDirectory> {
        let directory = InMemoryDirectory::with_cost(4);
        directory.add_user("alice", "s3cr3t", &[API_ACCESS_ROLE]).unwrap();
        directory.add_user("bob", "hunter2", &["Reports"]).unwrap();
        CredentialValidator::new(directory)
    }

    #[tokio::test]
    async fn test_each_stage() {
        let validator = validator();

        assert_eq!(
            validator.check("alice", "s3cr3t").await.unwrap(),
            Validation::Validated
        );
        assert_eq!(
            validator.check("carol", "s3cr3t").await.unwrap(),
            Validation::Declined(Decline::NotFound)
        );
        assert_eq!(
            validator.check("alice", "wrongpass").await.unwrap(),
            Validation::Declined(Decline::Rejected)
        );
        assert_eq!(
            validator.check("bob", "hunter2").await.unwrap(),
            Validation::Declined(Decline::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_blank_identifier() {
        let validator = validator();
        assert!(!validator.validate("", "anything").await.unwrap());
        assert!(!validator.validate("   ", "anything").await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_password_does_not_lock_out() {
        let validator = validator();
        assert!(!validator.validate("alice", "wrongpass").await.unwrap());
        assert!(validator.validate("alice", "s3cr3t").await.unwrap());
        assert_eq!(validator.directory().failed_attempts("alice"), 1);
    }
}
