//! Access token library.
//!
//! Issues signed-then-encrypted tokens for principals that have already been
//! validated, and verifies them on the way back in.

mod claims;
mod config;
mod envelope;
mod issuer;
mod keys;
mod record;

pub use claims::{
    camel_case_keys, Claim, ClaimSet, ClaimValue, ClaimValueType, AUDIENCE, EXPIRES, INFO,
    ISSUED_AT, ISSUER, JTI, NOT_BEFORE, SUCCESS, TOKEN_IDP, UNIQUE_NAME,
};
pub use config::TokenConfig;
pub use envelope::{decode_token, encode_token, VerifiedToken};
pub use issuer::{Information, TokenIssuer, IDP_TAG};
pub use keys::{
    EncryptingCredentials, EncryptionAlgorithm, KeyMaterial, SigningAlgorithm, SigningCredentials,
};
pub use record::{Decline, IssuanceRecord, TIMESTAMP_FORMAT};
