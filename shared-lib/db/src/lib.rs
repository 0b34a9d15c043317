//! MySQL connection pooling for the user directory.

mod config;
mod pool;

pub use config::DbConfig;
pub use pool::{create_pool, health_check, DbPool};

// Re-export sqlx types for convenience
pub use sqlx::{self, MySql, Row};
