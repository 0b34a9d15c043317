//! Command-line token issuance
//!
//! Authenticates `<user> <password>` against the configured MySQL directory
//! and prints the resulting record as JSON.

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use access_service::{AccessManager, Credentials, MySqlDirectory, ServiceConfig};
use error::ErrorResponse;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "access_token=info,access_service=info,auth=info,db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(user), Some(password)) = (args.next(), args.next()) else {
        bail!("usage: access-token <user> <password>");
    };

    // Load configuration
    let config = ServiceConfig::from_env();
    tracing::info!("Starting access-token v{}", config.version);

    let keys = config
        .token
        .key_material()
        .context("invalid token configuration")?;

    let pool = db::create_pool(&config.database).context("failed to create database pool")?;
    if let Err(e) = db::health_check(&pool).await {
        tracing::error!("User directory unreachable: {}", e);
        println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
        std::process::exit(2);
    }
    let manager = AccessManager::new(MySqlDirectory::new(pool), keys);

    let outcome = match manager.authenticate(&Credentials::new(user, password)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Authentication failed: {}", e);
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            std::process::exit(2);
        }
    };

    let issued = outcome.is_issued();
    println!("{}", serde_json::to_string_pretty(&outcome.into_record())?);

    if !issued {
        std::process::exit(1);
    }
    Ok(())
}
