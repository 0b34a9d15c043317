//! Access token issuance.

use chrono::{DateTime, Local, TimeDelta};
use error::AuthError;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::claims::{self, camel_case_keys, ClaimSet, ClaimValue};
use crate::envelope::encode_token;
use crate::keys::KeyMaterial;
use crate::record::IssuanceRecord;

/// Value of the `token_idp` claim on every token this crate issues.
pub const IDP_TAG: &str = "access-service";

/// Default informational payload embedded in the `info` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Information {
    pub service_name: String,
    pub service_version: String,
}

impl Default for Information {
    fn default() -> Self {
        Self {
            service_name: IDP_TAG.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Builds, signs and encrypts tokens for already-validated principals.
///
/// Holds no mutable state; a single issuer can be shared across tasks.
#[derive(Debug, Clone)]
pub struct TokenIssuer<I = Information> {
    keys: KeyMaterial,
    info: I,
}

impl TokenIssuer<Information> {
    pub fn with_default_info(keys: KeyMaterial) -> Self {
        Self::new(keys, Information::default())
    }
}

impl<I: Serialize> TokenIssuer<I> {
    pub fn new(keys: KeyMaterial, info: I) -> Self {
        Self { keys, info }
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Issue a token for `identifier`.
    ///
    /// The caller must already have validated the identifier; no check is
    /// repeated here.
    pub fn issue(&self, identifier: &str) -> Result<IssuanceRecord, AuthError> {
        self.issue_at(identifier, Local::now())
    }

    fn issue_at(
        &self,
        identifier: &str,
        created: DateTime<Local>,
    ) -> Result<IssuanceRecord, AuthError> {
        let lifetime = TimeDelta::try_seconds(self.keys.lifetime_seconds).ok_or_else(|| {
            AuthError::KeyMaterial(format!(
                "token lifetime out of range: {}",
                self.keys.lifetime_seconds
            ))
        })?;
        let expiration = created.checked_add_signed(lifetime).ok_or_else(|| {
            AuthError::TokenCreationFailed("expiration out of range".to_string())
        })?;

        let claims = self.build_claims(identifier, created.timestamp(), expiration.timestamp())?;
        let token = encode_token(&claims, &self.keys)?;

        tracing::info!(
            subject = identifier,
            token_id = claims.get_str(claims::JTI).unwrap_or_default(),
            "Issued access token"
        );

        Ok(IssuanceRecord::issued(created, expiration, token))
    }

    /// Assemble the claim set for `identifier` valid from `not_before` until `expires`.
    pub fn build_claims(
        &self,
        identifier: &str,
        not_before: i64,
        expires: i64,
    ) -> Result<ClaimSet, AuthError> {
        let info = serde_json::to_value(&self.info).map_err(|e| {
            tracing::error!("Failed to serialize token info: {}", e);
            AuthError::Serialization(e.to_string())
        })?;

        Ok(ClaimSet::new()
            .with(claims::JTI, new_token_id())
            .with(claims::UNIQUE_NAME, identifier)
            .with(claims::INFO, ClaimValue::Json(camel_case_keys(info)))
            .with(claims::SUCCESS, true)
            .with(claims::TOKEN_IDP, IDP_TAG)
            .with(claims::NOT_BEFORE, not_before)
            .with(claims::EXPIRES, expires)
            .with(claims::ISSUED_AT, not_before)
            .with(claims::ISSUER, self.keys.issuer.as_str())
            .with(claims::AUDIENCE, self.keys.audience.as_str()))
    }
}

/// 128 random bits, hex encoded.
fn new_token_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
