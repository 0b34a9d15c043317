//! Response returned to callers of the login flow.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Format of `created` and `expiration`. Local time, no offset marker.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a login was declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decline {
    /// No principal with that identifier (or the identifier was empty)
    NotFound,
    /// Secret did not match
    Rejected,
    /// Principal lacks the required role
    Unauthorized,
}

impl Decline {
    pub fn message(&self) -> &'static str {
        match self {
            Decline::NotFound => "Unknown user",
            Decline::Rejected => "Invalid credentials",
            Decline::Unauthorized => "Missing required role",
        }
    }
}

/// Result of a login attempt, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRecord {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub message: String,
}

impl IssuanceRecord {
    pub fn issued(created: DateTime<Local>, expiration: DateTime<Local>, token: String) -> Self {
        Self {
            authenticated: true,
            created: Some(created.format(TIMESTAMP_FORMAT).to_string()),
            expiration: Some(expiration.format(TIMESTAMP_FORMAT).to_string()),
            access_token: Some(token),
            message: "OK".to_string(),
        }
    }

    pub fn declined(decline: Decline) -> Self {
        Self {
            authenticated: false,
            created: None,
            expiration: None,
            access_token: None,
            message: decline.message().to_string(),
        }
    }
}
