//! Token configuration.

use std::fmt;

use error::AuthError;
use serde::{Deserialize, Serialize};

use crate::keys::{
    EncryptingCredentials, EncryptionAlgorithm, KeyMaterial, SigningAlgorithm, SigningCredentials,
};

/// Static token settings supplied at startup.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Value of the `iss` claim
    pub issuer: String,
    /// Value of the `aud` claim
    pub audience: String,
    /// Token lifetime in seconds
    pub seconds: i64,
    /// Encoded HMAC key (hex, base64url, base64 or raw)
    pub signing_key: String,
    pub signing_algorithm: SigningAlgorithm,
    /// Encoded content encryption key
    pub encryption_key: String,
    pub encryption_algorithm: EncryptionAlgorithm,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "access-service".to_string(),
            audience: "api-clients".to_string(),
            seconds: 3600,
            signing_key: String::new(),
            signing_algorithm: SigningAlgorithm::default(),
            encryption_key: String::new(),
            encryption_algorithm: EncryptionAlgorithm::default(),
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("seconds", &self.seconds)
            .field("signing_algorithm", &self.signing_algorithm)
            .field("encryption_algorithm", &self.encryption_algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(issuer) = std::env::var("TOKEN_ISSUER") {
            config.issuer = issuer;
        }

        if let Ok(audience) = std::env::var("TOKEN_AUDIENCE") {
            config.audience = audience;
        }

        if let Ok(seconds) = std::env::var("TOKEN_SECONDS") {
            if let Ok(n) = seconds.parse() {
                config.seconds = n;
            } else {
                tracing::warn!("Ignoring unparseable TOKEN_SECONDS: {}", seconds);
            }
        }

        if let Ok(key) = std::env::var("TOKEN_SIGNING_KEY") {
            config.signing_key = key;
        }

        if let Ok(alg) = std::env::var("TOKEN_SIGNING_ALG") {
            match SigningAlgorithm::from_str(&alg) {
                Some(a) => config.signing_algorithm = a,
                None => tracing::warn!("Ignoring unsupported TOKEN_SIGNING_ALG: {}", alg),
            }
        }

        if let Ok(key) = std::env::var("TOKEN_ENCRYPTION_KEY") {
            config.encryption_key = key;
        }

        if let Ok(alg) = std::env::var("TOKEN_ENCRYPTION_ALG") {
            match EncryptionAlgorithm::from_str(&alg) {
                Some(a) => config.encryption_algorithm = a,
                None => tracing::warn!("Ignoring unsupported TOKEN_ENCRYPTION_ALG: {}", alg),
            }
        }

        config
    }

    /// Decode the configured keys into usable key material.
    pub fn key_material(&self) -> Result<KeyMaterial, AuthError> {
        let signing = SigningCredentials::from_encoded(&self.signing_key, self.signing_algorithm)?;
        let encrypting =
            EncryptingCredentials::from_encoded(&self.encryption_key, self.encryption_algorithm)?;
        KeyMaterial::new(
            signing,
            encrypting,
            self.issuer.clone(),
            self.audience.clone(),
            self.seconds,
        )
    }
}
