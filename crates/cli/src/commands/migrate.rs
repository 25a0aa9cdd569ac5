//! Database migration commands.
//!
//! Storefront and admin share one database. The storefront owns the `shop`
//! schema and the admin the `admin` schema, which references `shop`, so
//! `migrate all` runs the storefront first.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` / `ADMIN_DATABASE_URL`, falling back to
//!   `DATABASE_URL`

use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run `crates/storefront/migrations`.
///
/// # Errors
///
/// Returns `MigrationError` if connecting or migrating fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;

    tracing::info!("Running storefront migrations...");
    whimsical_frog_storefront::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

/// Run `crates/admin/migrations`.
///
/// # Errors
///
/// Returns `MigrationError` if connecting or migrating fails.
pub async fn admin() -> Result<(), MigrationError> {
    let pool = connect("ADMIN_DATABASE_URL").await?;

    tracing::info!("Running admin migrations...");
    whimsical_frog_admin::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
