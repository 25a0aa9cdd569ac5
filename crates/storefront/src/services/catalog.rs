//! Cached catalog reads.
//!
//! Room pages and the `/shop` listing are read-heavy and change only when an
//! admin edits the catalog, so they are cached in memory with a short TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{CatalogRepository, RepositoryError};
use crate::models::catalog::group_by_category;
use crate::models::{CategorySection, RoomPage};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Room(i32),
    Shop,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Room(Arc<RoomPage>),
    Shop(Arc<Vec<CategorySection>>),
}

/// Catalog reads backed by a TTL cache.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(256).time_to_live(ttl).build(),
        }
    }

    /// Room page for `room_number`, or `None` for an unknown or inactive room.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn room(
        &self,
        pool: &PgPool,
        room_number: i32,
    ) -> Result<Option<Arc<RoomPage>>, RepositoryError> {
        let key = CacheKey::Room(room_number);
        if let Some(CacheValue::Room(page)) = self.cache.get(&key).await {
            debug!(room_number, "Cache hit for room");
            return Ok(Some(page));
        }

        let repo = CatalogRepository::new(pool);
        let Some(room) = repo.get_room(room_number).await? else {
            return Ok(None);
        };
        let category = repo.room_category(room_number).await?;
        let items = match &category {
            Some(c) => repo.items_in_category(c.id).await?,
            None => Vec::new(),
        };

        let page = Arc::new(RoomPage {
            room,
            category,
            items,
        });
        self.cache
            .insert(key, CacheValue::Room(Arc::clone(&page)))
            .await;
        Ok(Some(page))
    }

    /// Every visible item grouped by category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn shop(&self, pool: &PgPool) -> Result<Arc<Vec<CategorySection>>, RepositoryError> {
        if let Some(CacheValue::Shop(sections)) = self.cache.get(&CacheKey::Shop).await {
            debug!("Cache hit for shop");
            return Ok(sections);
        }

        let items = CatalogRepository::new(pool).all_visible_items().await?;
        let sections = Arc::new(group_by_category(items));
        self.cache
            .insert(CacheKey::Shop, CacheValue::Shop(Arc::clone(&sections)))
            .await;
        Ok(sections)
    }

    /// Drop everything, e.g. after checkout changed stock levels.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
