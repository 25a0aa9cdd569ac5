//! `wf-cli` subcommands.

pub mod migrate;
pub mod secrets;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Failures shared by every database-backed command.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `var`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConnectError::MissingEnvVar` if neither variable is set.
pub async fn connect(var: &'static str) -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(var)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar(var))?;

    tracing::info!("Connecting to database...");
    Ok(whimsical_frog_storefront::db::create_pool(&database_url).await?)
}
