//! Login flow: validate credentials, then issue a token.

use std::fmt;

use auth::{Decline, Information, IssuanceRecord, KeyMaterial, TokenIssuer};
use error::AuthError;
use serde::{Deserialize, Serialize};

use crate::directory::UserDirectory;
use crate::validator::{CredentialValidator, Validation};

/// Login request body.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Result of a login attempt that reached a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AuthOutcome {
    Issued(IssuanceRecord),
    Declined(Decline),
}

impl AuthOutcome {
    pub fn is_issued(&self) -> bool {
        matches!(self, AuthOutcome::Issued(_))
    }

    /// Response body for either outcome.
    pub fn into_record(self) -> IssuanceRecord {
        match self {
            AuthOutcome::Issued(record) => record,
            AuthOutcome::Declined(decline) => IssuanceRecord::declined(decline),
        }
    }
}

/// Validates credentials and issues tokens to principals that pass.
pub struct AccessManager<D, I = Information> {
    validator: CredentialValidator<D>,
    issuer: TokenIssuer<I>,
}

impl<D: UserDirectory> AccessManager<D, Information> {
    pub fn new(directory: D, keys: KeyMaterial) -> Self {
        Self::with_issuer(directory, TokenIssuer::with_default_info(keys))
    }
}

impl<D: UserDirectory, I: Serialize> AccessManager<D, I> {
    pub fn with_issuer(directory: D, issuer: TokenIssuer<I>) -> Self {
        Self {
            validator: CredentialValidator::new(directory),
            issuer,
        }
    }

    pub fn validator(&self) -> &CredentialValidator<D> {
        &self.validator
    }

    pub fn issuer(&self) -> &TokenIssuer<I> {
        &self.issuer
    }

    /// Run the full login flow.
    ///
    /// Declines come back as `Ok(AuthOutcome::Declined(_))`. Directory and
    /// cryptographic failures come back as `Err` and never produce a token.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, AuthError> {
        match self
            .validator
            .check(&credentials.user_id, &credentials.password)
            .await?
        {
            Validation::Validated => {
                let record = self.issuer.issue(&credentials.user_id)?;
                Ok(AuthOutcome::Issued(record))
            }
            Validation::Declined(decline) => Ok(AuthOutcome::Declined(decline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use crate::validator::API_ACCESS_ROLE;
    use auth::{EncryptingCredentials, EncryptionAlgorithm, SigningAlgorithm, SigningCredentials};

    fn manager() -> AccessManager<InMemoryDirectory> {
        let directory = InMemoryDirectory::with_cost(4);
        directory.add_user("alice", "s3cr3t", &[API_ACCESS_ROLE]).unwrap();
        let keys = KeyMaterial::new(
            SigningCredentials::generate(SigningAlgorithm::Hs256),
            EncryptingCredentials::generate(EncryptionAlgorithm::A256Gcm),
            "test-issuer",
            "test-audience",
            3600,
        )
        .unwrap();
        AccessManager::new(directory, keys)
    }

    #[tokio::test]
    async fn test_authenticate_issues_token() {
        let manager = manager();
        let outcome = manager
            .authenticate(&Credentials::new("alice", "s3cr3t"))
            .await
            .unwrap();
        assert!(outcome.is_issued());

        let record = outcome.into_record();
        assert!(record.authenticated);
        assert!(record.access_token.is_some());
    }

    #[tokio::test]
    async fn test_authenticate_declined() {
        let manager = manager();
        let outcome = manager
            .authenticate(&Credentials::new("alice", "nope"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Declined(Decline::Rejected));

        let record = outcome.into_record();
        assert!(!record.authenticated);
        assert!(record.access_token.is_none());
        assert_eq!(record.message, "Invalid credentials");
    }

    #[test]
    fn test_credentials_body() {
        let creds: Credentials =
            serde_json::from_str(r#"{"userID":"alice","password":"s3cr3t"}"#).unwrap();
        assert_eq!(creds.user_id, "alice");
        assert!(!format!("{:?}", creds).contains("s3cr3t"));
    }
}
