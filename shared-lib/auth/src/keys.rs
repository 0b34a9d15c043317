//! Signing and encryption key material.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use error::AuthError;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// HMAC algorithm used for the inner signed token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    #[default]
    #[serde(rename = "HS256")]
    Hs256,
    #[serde(rename = "HS384")]
    Hs384,
    #[serde(rename = "HS512")]
    Hs512,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::Hs384 => "HS384",
            SigningAlgorithm::Hs512 => "HS512",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "HS256" => Some(SigningAlgorithm::Hs256),
            "HS384" => Some(SigningAlgorithm::Hs384),
            "HS512" => Some(SigningAlgorithm::Hs512),
            _ => None,
        }
    }

    /// Keys shorter than the hash output are rejected.
    pub fn min_key_len(&self) -> usize {
        match self {
            SigningAlgorithm::Hs256 => 32,
            SigningAlgorithm::Hs384 => 48,
            SigningAlgorithm::Hs512 => 64,
        }
    }
}

/// Content encryption for the outer envelope. Key management is always `dir`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    #[serde(rename = "A128GCM")]
    A128Gcm,
    #[default]
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl EncryptionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::A128Gcm => "A128GCM",
            EncryptionAlgorithm::A256Gcm => "A256GCM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "A128GCM" => Some(EncryptionAlgorithm::A128Gcm),
            "A256GCM" => Some(EncryptionAlgorithm::A256Gcm),
            _ => None,
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            EncryptionAlgorithm::A128Gcm => 16,
            EncryptionAlgorithm::A256Gcm => 32,
        }
    }
}

/// Key and algorithm for signing the claim set.
#[derive(Clone)]
pub struct SigningCredentials {
    key: Vec<u8>,
    algorithm: SigningAlgorithm,
}

impl SigningCredentials {
    pub fn new(key: Vec<u8>, algorithm: SigningAlgorithm) -> Result<Self, AuthError> {
        if key.len() < algorithm.min_key_len() {
            return Err(AuthError::KeyMaterial(format!(
                "{} signing key must be at least {} bytes, got {}",
                algorithm.as_str(),
                algorithm.min_key_len(),
                key.len()
            )));
        }
        Ok(Self { key, algorithm })
    }

    /// Parse an encoded key (hex, base64url, base64 or raw).
    pub fn from_encoded(raw: &str, algorithm: SigningAlgorithm) -> Result<Self, AuthError> {
        let min = algorithm.min_key_len();
        let key = decode_key_material(raw, |len| len >= min).ok_or_else(|| {
            AuthError::KeyMaterial(format!(
                "{} signing key must decode to at least {} bytes",
                algorithm.as_str(),
                min
            ))
        })?;
        Self::new(key, algorithm)
    }

    /// Generate a random key of the minimum length for `algorithm`.
    pub fn generate(algorithm: SigningAlgorithm) -> Self {
        Self {
            key: random_bytes(algorithm.min_key_len()),
            algorithm,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Key and algorithm for encrypting the signed token.
#[derive(Clone)]
pub struct EncryptingCredentials {
    key: Vec<u8>,
    algorithm: EncryptionAlgorithm,
}

impl EncryptingCredentials {
    pub fn new(key: Vec<u8>, algorithm: EncryptionAlgorithm) -> Result<Self, AuthError> {
        if key.len() != algorithm.key_len() {
            return Err(AuthError::KeyMaterial(format!(
                "{} encryption key must be exactly {} bytes, got {}",
                algorithm.as_str(),
                algorithm.key_len(),
                key.len()
            )));
        }
        Ok(Self { key, algorithm })
    }

    /// Parse an encoded key (hex, base64url, base64 or raw).
    pub fn from_encoded(raw: &str, algorithm: EncryptionAlgorithm) -> Result<Self, AuthError> {
        let expected = algorithm.key_len();
        let key = decode_key_material(raw, |len| len == expected).ok_or_else(|| {
            AuthError::KeyMaterial(format!(
                "{} encryption key must decode to exactly {} bytes",
                algorithm.as_str(),
                expected
            ))
        })?;
        Self::new(key, algorithm)
    }

    pub fn generate(algorithm: EncryptionAlgorithm) -> Self {
        Self {
            key: random_bytes(algorithm.key_len()),
            algorithm,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for EncryptingCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptingCredentials")
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Everything needed to issue and verify tokens for one deployment.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub signing: SigningCredentials,
    pub encrypting: EncryptingCredentials,
    pub issuer: String,
    pub audience: String,
    /// Token lifetime in seconds
    pub lifetime_seconds: i64,
}

impl KeyMaterial {
    pub fn new(
        signing: SigningCredentials,
        encrypting: EncryptingCredentials,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime_seconds: i64,
    ) -> Result<Self, AuthError> {
        if lifetime_seconds <= 0 {
            return Err(AuthError::KeyMaterial(format!(
                "token lifetime must be positive, got {}",
                lifetime_seconds
            )));
        }
        Ok(Self {
            signing,
            encrypting,
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime_seconds,
        })
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Decode key material, returning the first interpretation whose length is accepted.
fn decode_key_material(raw: &str, accept: impl Fn(usize) -> bool) -> Option<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() % 2 == 0 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(trimmed) {
            if accept(bytes.len()) {
                return Some(bytes);
            }
        }
    }

    if let Ok(bytes) = general_purpose::URL_SAFE_NO_PAD.decode(trimmed) {
        if accept(bytes.len()) {
            return Some(bytes);
        }
    }

    if let Ok(bytes) = general_purpose::STANDARD.decode(trimmed) {
        if accept(bytes.len()) {
            return Some(bytes);
        }
    }

    let raw_bytes = trimmed.as_bytes();
    if accept(raw_bytes.len()) {
        return Some(raw_bytes.to_vec());
    }

    None
}
