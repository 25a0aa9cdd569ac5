//! Pricing settings shared with the storefront through `shop.settings`.

use sqlx::PgPool;
use sqlx::types::Json;

use whimsical_frog_core::pricing::PricingSettings;

use super::RepositoryError;

/// Settings key holding [`PricingSettings`].
pub const PRICING_KEY: &str = "pricing";

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current pricing settings, or defaults if none have been saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON is unreadable.
    pub async fn pricing(&self) -> Result<PricingSettings, RepositoryError> {
        let value: Option<Json<PricingSettings>> =
            sqlx::query_scalar("SELECT value FROM shop.settings WHERE key = $1")
                .bind(PRICING_KEY)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::ColumnDecode { source, .. } => {
                        RepositoryError::DataCorruption(format!("pricing settings: {source}"))
                    }
                    other => RepositoryError::Database(other),
                })?;
        Ok(value.map(|Json(s)| s).unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn save_pricing(&self, settings: &PricingSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            ",
        )
        .bind(PRICING_KEY)
        .bind(Json(settings))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
