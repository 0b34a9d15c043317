//! Access service library
//!
//! Validates login credentials against a user directory and issues
//! signed, encrypted access tokens to principals holding the API access role.

pub mod config;
pub mod directory;
pub mod manager;
pub mod memory;
pub mod mysql;
pub mod validator;

pub use config::ServiceConfig;
pub use directory::{DirectoryError, Principal, UserDirectory};
pub use manager::{AccessManager, AuthOutcome, Credentials};
pub use memory::InMemoryDirectory;
pub use mysql::MySqlDirectory;
pub use validator::{CredentialValidator, Validation, API_ACCESS_ROLE};
