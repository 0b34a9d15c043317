//! Token envelope encoding and decoding.
//!
//! Claims are first signed into a compact JWS, which then becomes the
//! plaintext of a compact JWE (`dir` key management, AES-GCM content
//! encryption). Verifiers must decrypt before they can check the signature.

use aes_gcm::aead::{Aead, KeyInit, Nonce, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use error::AuthError;
use hmac::{Hmac, Mac};
use jwt::header::HeaderType;
use jwt::{Header, SignWithKey, Token, VerifyWithKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Sha256, Sha384, Sha512};

use crate::claims::{self, ClaimSet};
use crate::keys::{
    EncryptingCredentials, EncryptionAlgorithm, KeyMaterial, SigningAlgorithm, SigningCredentials,
};

/// Key management algorithm: the shared key is the content encryption key.
const KEY_MANAGEMENT_DIRECT: &str = "dir";
const NESTED_CONTENT_TYPE: &str = "JWT";
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Protected header of the outer encrypted layer.
#[derive(Debug, Serialize, Deserialize)]
struct EncryptionHeader {
    alg: String,
    enc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// A token that decrypted, verified and passed the time and audience checks.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub claims: ClaimSet,
}

impl VerifiedToken {
    pub fn subject(&self) -> Option<&str> {
        self.claims.get_str(claims::UNIQUE_NAME)
    }

    pub fn token_id(&self) -> Option<&str> {
        self.claims.get_str(claims::JTI)
    }

    pub fn not_before(&self) -> Option<i64> {
        self.claims.get_i64(claims::NOT_BEFORE)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.claims.get_i64(claims::EXPIRES)
    }
}

/// Sign `claims` and encrypt the signed token.
pub fn encode_token(claims: &ClaimSet, keys: &KeyMaterial) -> Result<String, AuthError> {
    let signed = sign_claims(claims, &keys.signing)?;
    encrypt(signed.as_bytes(), &keys.encrypting)
}

/// Decrypt, verify and validate a token.
pub fn decode_token(token: &str, keys: &KeyMaterial) -> Result<VerifiedToken, AuthError> {
    let plaintext = decrypt(token, &keys.encrypting)?;
    let signed = String::from_utf8(plaintext).map_err(|_| AuthError::InvalidToken)?;
    let claims = verify_claims(&signed, &keys.signing)?;

    let iss = claims.get_str(claims::ISSUER).ok_or(AuthError::InvalidToken)?;
    if iss != keys.issuer {
        tracing::warn!("Invalid issuer: expected {}, got {}", keys.issuer, iss);
        return Err(AuthError::InvalidToken);
    }

    if !audience_matches(&claims, &keys.audience) {
        tracing::warn!("Token audience does not include {}", keys.audience);
        return Err(AuthError::InvalidToken);
    }

    let nbf = claims
        .get_i64(claims::NOT_BEFORE)
        .ok_or(AuthError::InvalidToken)?;
    let exp = claims.get_i64(claims::EXPIRES).ok_or(AuthError::InvalidToken)?;

    let now = chrono::Utc::now().timestamp();
    if now < nbf {
        return Err(AuthError::TokenNotYetValid);
    }
    if now >= exp {
        return Err(AuthError::TokenExpired);
    }

    Ok(VerifiedToken { claims })
}

fn audience_matches(claims: &ClaimSet, expected: &str) -> bool {
    match claims.get(claims::AUDIENCE) {
        Some(claims::ClaimValue::String(aud)) => aud == expected,
        Some(claims::ClaimValue::Json(Value::Array(auds))) => {
            auds.iter().any(|a| a.as_str() == Some(expected))
        }
        _ => false,
    }
}

fn sign_claims(claims: &ClaimSet, credentials: &SigningCredentials) -> Result<String, AuthError> {
    let key = credentials.key();
    match credentials.algorithm() {
        SigningAlgorithm::Hs256 => {
            sign_with(<Hmac<Sha256> as Mac>::new_from_slice(key).map_err(invalid_hmac_key)?, claims)
        }
        SigningAlgorithm::Hs384 => {
            sign_with(<Hmac<Sha384> as Mac>::new_from_slice(key).map_err(invalid_hmac_key)?, claims)
        }
        SigningAlgorithm::Hs512 => {
            sign_with(<Hmac<Sha512> as Mac>::new_from_slice(key).map_err(invalid_hmac_key)?, claims)
        }
    }
}

fn verify_claims(token: &str, credentials: &SigningCredentials) -> Result<ClaimSet, AuthError> {
    let key = credentials.key();
    match credentials.algorithm() {
        SigningAlgorithm::Hs256 => {
            verify_with(<Hmac<Sha256> as Mac>::new_from_slice(key).map_err(invalid_hmac_key)?, token)
        }
        SigningAlgorithm::Hs384 => {
            verify_with(<Hmac<Sha384> as Mac>::new_from_slice(key).map_err(invalid_hmac_key)?, token)
        }
        SigningAlgorithm::Hs512 => {
            verify_with(<Hmac<Sha512> as Mac>::new_from_slice(key).map_err(invalid_hmac_key)?, token)
        }
    }
}

fn invalid_hmac_key(e: hmac::digest::InvalidLength) -> AuthError {
    tracing::error!("Failed to create HMAC key: {}", e);
    AuthError::KeyMaterial(e.to_string())
}

fn sign_with<K: jwt::SigningAlgorithm>(key: K, claims: &ClaimSet) -> Result<String, AuthError> {
    let header = Header {
        algorithm: key.algorithm_type(),
        type_: Some(HeaderType::JsonWebToken),
        ..Default::default()
    };

    let token = Token::new(header, claims).sign_with_key(&key).map_err(|e| {
        tracing::error!("Failed to sign claims: {}", e);
        AuthError::TokenCreationFailed(e.to_string())
    })?;
    Ok(token.as_str().to_owned())
}

fn verify_with<K: jwt::VerifyingAlgorithm>(key: K, token: &str) -> Result<ClaimSet, AuthError> {
    token.verify_with_key(&key).map_err(|e| {
        tracing::warn!("Failed to verify token signature: {}", e);
        AuthError::InvalidToken
    })
}

fn encrypt(plaintext: &[u8], credentials: &EncryptingCredentials) -> Result<String, AuthError> {
    let header = EncryptionHeader {
        alg: KEY_MANAGEMENT_DIRECT.to_string(),
        enc: credentials.algorithm().as_str().to_string(),
        cty: Some(NESTED_CONTENT_TYPE.to_string()),
        typ: Some(NESTED_CONTENT_TYPE.to_string()),
    };
    let header_json = serde_json::to_vec(&header).map_err(|e| {
        tracing::error!("Failed to serialize encryption header: {}", e);
        AuthError::Serialization(e.to_string())
    })?;
    let protected = URL_SAFE_NO_PAD.encode(header_json);

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    // The encoded protected header is the additional authenticated data.
    let sealed = match credentials.algorithm() {
        EncryptionAlgorithm::A128Gcm => {
            seal::<Aes128Gcm>(credentials.key(), &iv, plaintext, protected.as_bytes())
        }
        EncryptionAlgorithm::A256Gcm => {
            seal::<Aes256Gcm>(credentials.key(), &iv, plaintext, protected.as_bytes())
        }
    }?;

    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    // Empty second segment: `dir` carries no encrypted key.
    Ok(format!(
        "{}..{}.{}.{}",
        protected,
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

fn decrypt(token: &str, credentials: &EncryptingCredentials) -> Result<Vec<u8>, AuthError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
        tracing::warn!("Token is not a five-part encrypted envelope");
        return Err(AuthError::InvalidToken);
    };

    let header: EncryptionHeader = URL_SAFE_NO_PAD
        .decode(protected)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(AuthError::InvalidToken)?;

    if header.alg != KEY_MANAGEMENT_DIRECT
        || header.enc != credentials.algorithm().as_str()
        || !encrypted_key.is_empty()
    {
        tracing::warn!(
            "Unexpected envelope algorithms: alg={}, enc={}",
            header.alg,
            header.enc
        );
        return Err(AuthError::InvalidToken);
    }

    let iv = decode_segment(iv)?;
    let mut sealed = decode_segment(ciphertext)?;
    let tag = decode_segment(tag)?;
    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(AuthError::InvalidToken);
    }
    sealed.extend_from_slice(&tag);

    match credentials.algorithm() {
        EncryptionAlgorithm::A128Gcm => {
            open::<Aes128Gcm>(credentials.key(), &iv, &sealed, protected.as_bytes())
        }
        EncryptionAlgorithm::A256Gcm => {
            open::<Aes256Gcm>(credentials.key(), &iv, &sealed, protected.as_bytes())
        }
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken)
}

fn seal<C: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    msg: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, AuthError> {
    let cipher = C::new_from_slice(key).map_err(|e| {
        tracing::error!("Failed to create content encryption key: {}", e);
        AuthError::KeyMaterial(e.to_string())
    })?;
    cipher
        .encrypt(Nonce::<C>::from_slice(iv), Payload { msg, aad })
        .map_err(|e| {
            tracing::error!("Failed to encrypt token: {}", e);
            AuthError::TokenCreationFailed("encryption failed".to_string())
        })
}

fn open<C: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, AuthError> {
    let cipher = C::new_from_slice(key).map_err(|e| AuthError::KeyMaterial(e.to_string()))?;
    cipher
        .decrypt(Nonce::<C>::from_slice(iv), Payload { msg: sealed, aad })
        .map_err(|_| {
            tracing::warn!("Failed to decrypt token");
            AuthError::InvalidToken
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ClaimValue;

    fn test_keys(lifetime: i64) -> KeyMaterial {
        KeyMaterial::new(
            SigningCredentials::generate(SigningAlgorithm::Hs256),
            EncryptingCredentials::generate(EncryptionAlgorithm::A256Gcm),
            "test-issuer",
            "test-audience",
            lifetime,
        )
        .unwrap()
    }

    fn test_claims(keys: &KeyMaterial, nbf: i64, exp: i64) -> ClaimSet {
        ClaimSet::new()
            .with(claims::JTI, "0123456789abcdef0123456789abcdef")
            .with(claims::UNIQUE_NAME, "user123")
            .with(claims::SUCCESS, true)
            .with(claims::NOT_BEFORE, nbf)
            .with(claims::EXPIRES, exp)
            .with(claims::ISSUER, keys.issuer.as_str())
            .with(claims::AUDIENCE, keys.audience.as_str())
    }

    #[test]
    fn test_encode_decode_token() {
        let keys = test_keys(3600);
        let now = chrono::Utc::now().timestamp();
        let claims = test_claims(&keys, now, now + 3600);

        let token = encode_token(&claims, &keys).expect("Failed to encode");
        assert_eq!(token.split('.').count(), 5);

        let decoded = decode_token(&token, &keys).expect("Failed to decode");
        assert_eq!(decoded.subject(), Some("user123"));
        assert_eq!(decoded.claims, claims);
    }

    #[test]
    fn test_envelope_header_and_inner_token() {
        let keys = test_keys(3600);
        let now = chrono::Utc::now().timestamp();
        let token = encode_token(&test_claims(&keys, now, now + 60), &keys).unwrap();

        let header_bytes = URL_SAFE_NO_PAD.decode(token.split('.').next().unwrap()).unwrap();
        let header: Value = serde_json::from_slice(&header_bytes).unwrap();
        assert_eq!(header["alg"], "dir");
        assert_eq!(header["enc"], "A256GCM");
        assert_eq!(header["cty"], "JWT");

        let inner = String::from_utf8(decrypt(&token, &keys.encrypting).unwrap()).unwrap();
        assert_eq!(inner.split('.').count(), 3);
        let inner_header = URL_SAFE_NO_PAD.decode(inner.split('.').next().unwrap()).unwrap();
        let inner_header: Value = serde_json::from_slice(&inner_header).unwrap();
        assert_eq!(inner_header["alg"], "HS256");
        assert_eq!(inner_header["typ"], "JWT");
    }

    #[test]
    fn test_wrong_encryption_key_rejected() {
        let keys = test_keys(3600);
        let mut other = keys.clone();
        other.encrypting = EncryptingCredentials::generate(EncryptionAlgorithm::A256Gcm);

        let now = chrono::Utc::now().timestamp();
        let token = encode_token(&test_claims(&keys, now, now + 60), &keys).unwrap();
        assert!(matches!(
            decode_token(&token, &other),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_signing_key_rejected() {
        let keys = test_keys(3600);
        let mut other = keys.clone();
        other.signing = SigningCredentials::generate(SigningAlgorithm::Hs256);

        let now = chrono::Utc::now().timestamp();
        let token = encode_token(&test_claims(&keys, now, now + 60), &keys).unwrap();
        assert!(matches!(
            decode_token(&token, &other),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let keys = test_keys(3600);
        let now = chrono::Utc::now().timestamp();
        let token = encode_token(&test_claims(&keys, now, now + 60), &keys).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut ciphertext = URL_SAFE_NO_PAD.decode(&parts[3]).unwrap();
        ciphertext[0] ^= 0x01;
        parts[3] = URL_SAFE_NO_PAD.encode(ciphertext);

        assert!(decode_token(&parts.join("."), &keys).is_err());
        assert!(decode_token("not.a.token", &keys).is_err());
    }

    #[test]
    fn test_expired_and_future_tokens() {
        let keys = test_keys(3600);
        let now = chrono::Utc::now().timestamp();

        let expired = encode_token(&test_claims(&keys, now - 120, now - 60), &keys).unwrap();
        assert!(matches!(
            decode_token(&expired, &keys),
            Err(AuthError::TokenExpired)
        ));

        let future = encode_token(&test_claims(&keys, now + 600, now + 1200), &keys).unwrap();
        assert!(matches!(
            decode_token(&future, &keys),
            Err(AuthError::TokenNotYetValid)
        ));
    }

    #[test]
    fn test_issuer_and_audience_checked() {
        let keys = test_keys(3600);
        let now = chrono::Utc::now().timestamp();

        let claims = test_claims(&keys, now, now + 60).with(claims::ISSUER, "someone-else");
        let token = encode_token(&claims, &keys).unwrap();
        assert!(decode_token(&token, &keys).is_err());

        let claims = test_claims(&keys, now, now + 60).with(
            claims::AUDIENCE,
            ClaimValue::Json(serde_json::json!(["other", "test-audience"])),
        );
        let token = encode_token(&claims, &keys).unwrap();
        assert!(decode_token(&token, &keys).is_ok());
    }

    #[test]
    fn test_other_algorithms() {
        let keys = KeyMaterial::new(
            SigningCredentials::generate(SigningAlgorithm::Hs512),
            EncryptingCredentials::generate(EncryptionAlgorithm::A128Gcm),
            "test-issuer",
            "test-audience",
            60,
        )
        .unwrap();
        let now = chrono::Utc::now().timestamp();
        let token = encode_token(&test_claims(&keys, now, now + 60), &keys).unwrap();
        let decoded = decode_token(&token, &keys).unwrap();
        assert_eq!(decoded.token_id(), Some("0123456789abcdef0123456789abcdef"));
    }
}
