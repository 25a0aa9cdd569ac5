//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{PricingCache, SecretCipher};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    cipher: SecretCipher,
    pricing: PricingCache,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let cipher = SecretCipher::new(&config.secrets);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cipher,
                pricing: PricingCache::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Encryption for the secrets store.
    #[must_use]
    pub fn cipher(&self) -> &SecretCipher {
        &self.inner.cipher
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingCache {
        &self.inner.pricing
    }
}
