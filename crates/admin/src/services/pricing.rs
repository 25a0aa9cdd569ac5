//! Cached pricing settings.
//!
//! Every order edit re-quotes with the store's pricing settings. They change
//! only from the settings page, which invalidates the cache on save.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use whimsical_frog_core::pricing::PricingSettings;

use crate::db::{RepositoryError, SettingsRepository};

const PRICING_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct PricingCache {
    cache: Cache<(), Arc<PricingSettings>>,
}

impl Default for PricingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(PRICING_TTL)
                .build(),
        }
    }

    /// Current settings, loading them on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the stored settings cannot be read.
    pub async fn get(&self, pool: &PgPool) -> Result<Arc<PricingSettings>, RepositoryError> {
        if let Some(settings) = self.cache.get(&()).await {
            return Ok(settings);
        }
        debug!("Loading pricing settings");
        let settings = Arc::new(SettingsRepository::new(pool).pricing().await?);
        self.cache.insert((), Arc::clone(&settings)).await;
        Ok(settings)
    }

    /// Persist new settings and drop the cached copy.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn save(
        &self,
        pool: &PgPool,
        settings: &PricingSettings,
    ) -> Result<(), RepositoryError> {
        SettingsRepository::new(pool).save_pricing(settings).await?;
        self.cache.invalidate(&()).await;
        Ok(())
    }
}
