use auth::TokenConfig;
use db::DbConfig;
use serde::{Deserialize, Serialize};

/// Access service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Token issuer, audience, lifetime and keys
    #[serde(default)]
    pub token: TokenConfig,

    /// User directory database
    #[serde(default)]
    pub database: DbConfig,

    /// Service version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            database: DbConfig::default(),
            version: default_version(),
        }
    }
}

impl ServiceConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            token: TokenConfig::from_env(),
            database: DbConfig::from_env(),
            version: default_version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_nested_config() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"token":{"issuer":"idp","seconds":900},"database":{"host":"db.internal"}}"#,
        )
        .unwrap();
        assert_eq!(config.token.issuer, "idp");
        assert_eq!(config.token.seconds, 900);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
    }
}
