//! Common error types for the access token services.
//!
//! Declined logins are not errors; they are reported as values by the
//! validator. Everything in here is an infrastructure, cryptographic or
//! token-verification failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user directory could not answer. Never a bad-credentials signal.
    #[error("User directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Invalid key material: {0}")]
    KeyMaterial(String),

    #[error("Token creation failed: {0}")]
    TokenCreationFailed(String),

    #[error("Claim serialization failed: {0}")]
    Serialization(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,
}

impl AuthError {
    /// True for failures that come from the infrastructure rather than the token.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AuthError::DirectoryUnavailable(_))
    }
}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        AuthError::DirectoryUnavailable(err.to_string())
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        let (code, message) = match err {
            AuthError::DirectoryUnavailable(_) => {
                ("AUTH_DIRECTORY_UNAVAILABLE", "User directory unavailable")
            }
            AuthError::KeyMaterial(_) => ("AUTH_KEY_MATERIAL", "Token keys are misconfigured"),
            AuthError::TokenCreationFailed(_) => {
                ("AUTH_TOKEN_CREATION_FAILED", "Failed to create token")
            }
            AuthError::Serialization(_) => ("AUTH_SERIALIZATION", "Failed to serialize claims"),
            AuthError::InvalidToken => ("AUTH_INVALID_TOKEN", "Invalid token"),
            AuthError::TokenExpired => ("AUTH_TOKEN_EXPIRED", "Token has expired"),
            AuthError::TokenNotYetValid => ("AUTH_TOKEN_NOT_YET_VALID", "Token is not yet valid"),
        };
        Self::new(code, message)
    }
}

impl From<&DatabaseError> for ErrorResponse {
    fn from(err: &DatabaseError) -> Self {
        let (code, message) = match err {
            DatabaseError::ConnectionFailed(_) => {
                ("DB_CONNECTION_FAILED", "Database connection failed")
            }
            DatabaseError::QueryFailed(_) => ("DB_QUERY_FAILED", "Database query failed"),
        };
        Self::new(code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_is_not_a_token_error() {
        let err: AuthError = DatabaseError::ConnectionFailed("refused".to_string()).into();
        assert!(err.is_infrastructure());
        assert!(!AuthError::InvalidToken.is_infrastructure());

        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "AUTH_DIRECTORY_UNAVAILABLE");
    }

    #[test]
    fn test_error_response_details() {
        let response = ErrorResponse::from(&AuthError::KeyMaterial("short key".to_string()))
            .with_details("short key");
        assert_eq!(response.code, "AUTH_KEY_MATERIAL");
        assert_eq!(response.details.as_deref(), Some("short key"));

        let json = serde_json::to_string(&ErrorResponse::new("X", "y")).unwrap();
        assert!(!json.contains("details"));
    }
}
