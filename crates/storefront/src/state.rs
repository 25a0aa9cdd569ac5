//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::CatalogCache;
use crate::services::email::OrderMailer;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogCache,
    mailer: Option<OrderMailer>,
}

impl AppState {
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let catalog = CatalogCache::new(config.catalog_cache_ttl);
        let mailer = config.email.as_ref().and_then(|email| {
            OrderMailer::new(email, &config.store_name)
                .inspect_err(|e| tracing::warn!("Order emails disabled: {e}"))
                .ok()
        });
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                mailer,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Cached room and shop listings.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// `None` when SMTP is not configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&OrderMailer> {
        self.inner.mailer.as_ref()
    }
}
