//! Inventory items.
//!
//! New items get a generated SKU (`WF-{CODE}-{NNN}`) unless one is supplied.
//! Generation holds an advisory lock so concurrent creates never collide.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use whimsical_frog_core::CategoryId;
use whimsical_frog_core::sku::{SKU_PREFIX, next_sku};

use super::{RepositoryError, like_pattern};
use crate::models::{InventoryItem, InventoryQuery, ItemInput};

/// Advisory lock key held while allocating SKUs.
const SKU_LOCK: i64 = 0x5746_534b_5553_4551;

#[derive(sqlx::FromRow)]
struct ItemRow {
    sku: String,
    name: String,
    category_id: Option<CategoryId>,
    category: Option<String>,
    stock_level: i32,
    reorder_point: i32,
    cost_price: Decimal,
    retail_price: Decimal,
    description: String,
    image_url: Option<String>,
    is_active: bool,
    is_archived: bool,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        Self {
            sku: row.sku,
            name: row.name,
            category_id: row.category_id,
            category: row.category,
            stock_level: row.stock_level,
            reorder_point: row.reorder_point,
            cost_price: row.cost_price,
            retail_price: row.retail_price,
            description: row.description,
            image_url: row.image_url,
            is_active: row.is_active,
            is_archived: row.is_archived,
            updated_at: row.updated_at,
        }
    }
}

const ITEM_SELECT: &str = r"
    SELECT i.sku, i.name, i.category_id, c.name AS category, i.stock_level, i.reorder_point,
           i.cost_price, i.retail_price, i.description, i.image_url, i.is_active,
           i.is_archived, i.updated_at
    FROM shop.items i
    LEFT JOIN shop.categories c ON c.id = i.category_id
";

pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Items matching the query, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &InventoryQuery) -> Result<Vec<InventoryItem>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            r"
            {ITEM_SELECT}
            WHERE ($1::text IS NULL OR i.sku ILIKE $1 OR i.name ILIKE $1)
              AND ($2::int IS NULL OR i.category_id = $2)
              AND ($3 OR NOT i.is_archived)
            ORDER BY i.name, i.sku
            "
        ))
        .bind(query.search().map(like_pattern))
        .bind(query.category_id())
        .bind(query.include_archived())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, sku: &str) -> Result<Option<InventoryItem>, RepositoryError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{ITEM_SELECT} WHERE i.sku = $1"))
            .bind(sku)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(InventoryItem::from))
    }

    /// Create an item. A blank `input.sku` is replaced by the next free SKU
    /// for `code`. Returns the stored SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU already exists or no
    /// sequence number is left for `code`, and
    /// `RepositoryError::NotFound` if the category does not.
    pub async fn create(&self, input: &ItemInput, code: &str) -> Result<String, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sku = if input.sku.is_empty() {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(SKU_LOCK)
                .execute(&mut *tx)
                .await?;
            let existing: Vec<String> =
                sqlx::query_scalar("SELECT sku FROM shop.items WHERE sku LIKE $1")
                    .bind(format!("{SKU_PREFIX}-{code}-%"))
                    .fetch_all(&mut *tx)
                    .await?;
            next_sku(code, existing.iter().map(String::as_str)).ok_or_else(|| {
                RepositoryError::Conflict(format!("No SKU numbers left for {code}"))
            })?
        } else {
            input.sku.clone()
        };

        sqlx::query(
            r"
            INSERT INTO shop.items (
                sku, name, category_id, stock_level, reorder_point, cost_price,
                retail_price, description, image_url, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&sku)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(input.stock_level)
        .bind(input.reorder_point)
        .bind(input.cost_price)
        .bind(input.retail_price)
        .bind(&input.description)
        .bind(input.image())
        .bind(input.active())
        .execute(&mut *tx)
        .await
        .map_err(|e| match RepositoryError::from_unique(e, "SKU already exists") {
            RepositoryError::Database(e) => {
                RepositoryError::from_foreign_key(e, "Category not found")
            }
            other => other,
        })?;

        tx.commit().await?;
        Ok(sku)
    }

    /// Update every editable field of an item. The SKU itself never changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn update(&self, sku: &str, input: &ItemInput) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.items SET
                name = $2, category_id = $3, stock_level = $4, reorder_point = $5,
                cost_price = $6, retail_price = $7, description = $8, image_url = $9,
                is_active = $10, updated_at = now()
            WHERE sku = $1
            ",
        )
        .bind(sku)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(input.stock_level)
        .bind(input.reorder_point)
        .bind(input.cost_price)
        .bind(input.retail_price)
        .bind(&input.description)
        .bind(input.image())
        .bind(input.active())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_foreign_key(e, "Category not found"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Archive (hide everywhere) or restore an item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn set_archived(&self, sku: &str, archived: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.items SET is_archived = $2, updated_at = now() WHERE sku = $1",
        )
        .bind(sku)
        .bind(archived)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set an absolute stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn set_stock(&self, sku: &str, stock_level: i32) -> Result<InventoryItem, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.items SET stock_level = $2, updated_at = now() WHERE sku = $1",
        )
        .bind(sku)
        .bind(stock_level)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(sku).await?.ok_or(RepositoryError::NotFound)
    }

    /// Active items at or below their reorder point, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, limit: i64) -> Result<Vec<InventoryItem>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            r"
            {ITEM_SELECT}
            WHERE i.is_active AND NOT i.is_archived AND i.stock_level <= i.reorder_point
            ORDER BY i.stock_level, i.name
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    /// Number of unarchived items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_products(&self) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT count(*) FROM shop.items WHERE NOT is_archived")
                .fetch_one(self.pool)
                .await?,
        )
    }
}
