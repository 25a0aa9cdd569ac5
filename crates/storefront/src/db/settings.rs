//! Business settings stored as JSON in `shop.settings`.

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
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` if the stored JSON is unreadable.
    pub async fn pricing(&self) -> Result<PricingSettings, RepositoryError> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM shop.settings WHERE key = $1")
                .bind(PRICING_KEY)
                .fetch_optional(self.pool)
                .await?;

        match value {
            Some(v) => serde_json::from_value(v)
                .map_err(|e| RepositoryError::DataCorruption(format!("pricing settings: {e}"))),
            None => Ok(PricingSettings::default()),
        }
    }

    /// Replace the stored pricing settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save_pricing(&self, settings: &PricingSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.settings (key, value)
            VALUES ($1, $2)
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
