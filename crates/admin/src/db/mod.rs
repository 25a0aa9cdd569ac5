//! Database operations for the back office.
//!
//! The admin shares one database with the storefront. It reads and writes the
//! `shop` schema (users, catalog, orders, rooms, settings) and owns the
//! `admin` schema:
//!
//! ## Tables
//!
//! - `sku_rules` - Category name to SKU prefix overrides
//! - `secrets` - Encrypted key/value configuration
//! - `marketing_suggestions` - Per-item marketing copy
//! - `session` - Admin session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p whimsical-frog-cli -- migrate admin
//! ```

pub mod categories;
pub mod customers;
pub mod inventory;
pub mod marketing;
pub mod orders;
pub mod reports;
pub mod rooms;
pub mod secrets;
pub mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::{CategoryRepository, SkuRuleRepository};
pub use customers::CustomerRepository;
pub use inventory::InventoryRepository;
pub use marketing::MarketingRepository;
pub use orders::OrderRepository;
pub use reports::ReportRepository;
pub use rooms::RoomRepository;
pub use secrets::SecretRepository;
pub use settings::SettingsRepository;

/// Embedded `admin` schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate category name).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Input rejected before reaching the database.
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl RepositoryError {
    /// Map unique violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }

    /// Map foreign key violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_foreign_key(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Escape `%`, `_` and `\` for use inside a `LIKE` pattern.
#[must_use]
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" mug "), "%mug%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
