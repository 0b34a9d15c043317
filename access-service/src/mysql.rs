//! MySQL-backed user directory
//!
//! Reads Identity-style tables:
//!
//! ```sql
//! users      (id, user_name, normalized_user_name, password_hash)
//! roles      (id, name, normalized_name)
//! user_roles (user_id, role_id)
//! ```
//!
//! Lookups use the upper-cased normalized columns. Nothing is written.

use db::{sqlx, DbPool};

use crate::directory::{verify_bcrypt, DirectoryError, Principal, UserDirectory};

const FIND_PRINCIPAL: &str = "SELECT id, user_name, password_hash \
     FROM users WHERE normalized_user_name = ? LIMIT 1";

const HAS_ROLE: &str = "SELECT COUNT(*) FROM user_roles ur \
     INNER JOIN roles r ON r.id = ur.role_id \
     WHERE ur.user_id = ? AND r.normalized_name = ?";

/// Directory reading users and roles from MySQL.
#[derive(Clone)]
pub struct MySqlDirectory {
    pool: DbPool,
}

impl MySqlDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

fn query_error(e: sqlx::Error) -> DirectoryError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Tls(_) => {
            tracing::error!("User directory unreachable: {}", e);
            DirectoryError::Unavailable(e.to_string())
        }
        other => {
            tracing::error!("User directory query failed: {}", other);
            DirectoryError::Query(other.to_string())
        }
    }
}

impl UserDirectory for MySqlDirectory {
    async fn find_principal(&self, identifier: &str) -> Result<Option<Principal>, DirectoryError> {
        let row: Option<(String, String, String)> = sqlx::query_as(FIND_PRINCIPAL)
            .bind(normalize(identifier))
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(row.map(|(id, user_name, password_hash)| Principal {
            id,
            user_name,
            password_hash,
        }))
    }

    async fn check_secret(
        &self,
        principal: &Principal,
        secret: &str,
    ) -> Result<bool, DirectoryError> {
        verify_bcrypt(secret, &principal.password_hash).await
    }

    async fn has_role(&self, principal: &Principal, role: &str) -> Result<bool, DirectoryError> {
        let count: i64 = sqlx::query_scalar(HAS_ROLE)
            .bind(&principal.id)
            .bind(normalize(role))
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(count > 0)
    }
}
