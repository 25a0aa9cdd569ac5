//! Catalog queries: categories, items and rooms.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use whimsical_frog_core::CategoryId;
use whimsical_frog_core::sku::price_lookup_candidates;

use super::RepositoryError;
use crate::models::{Category, Item, Room, catalog::default_room_category};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    sort_order: i32,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            sort_order: row.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    sku: String,
    name: String,
    category_id: Option<i32>,
    category: Option<String>,
    stock_level: i32,
    retail_price: Decimal,
    description: String,
    image_url: Option<String>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            sku: row.sku,
            name: row.name,
            category_id: row.category_id.map(CategoryId::new),
            category: row.category,
            stock_level: row.stock_level,
            retail_price: row.retail_price,
            description: row.description,
            image_url: row.image_url,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    room_number: i32,
    room_name: String,
    door_label: String,
    description: String,
    display_order: i32,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            room_number: row.room_number,
            room_name: row.room_name,
            door_label: row.door_label,
            description: row.description,
            display_order: row.display_order,
        }
    }
}

const ITEM_SELECT: &str = r"
    SELECT i.sku, i.name, i.category_id, c.name AS category, i.stock_level,
           i.retail_price, i.description, i.image_url
    FROM shop.items i
    LEFT JOIN shop.categories c ON c.id = i.category_id
";

/// Items visible to customers: active and not archived.
const VISIBLE: &str = "WHERE i.is_active AND NOT i.is_archived";

/// A requested SKU matched to the catalog item that prices it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceMatch {
    /// The catalog SKU, which may be a base of the requested one.
    pub sku: String,
    pub price: Decimal,
}

/// Match each of `skus` to an orderable (not archived) item.
///
/// Variant SKUs fall back to their base SKUs in
/// [`price_lookup_candidates`] order. The result is aligned with `skus`;
/// `None` means nothing matched.
///
/// Takes any executor so checkout can resolve inside its transaction.
pub(crate) async fn resolve_prices<'e, E>(
    executor: E,
    skus: &[String],
) -> Result<Vec<Option<PriceMatch>>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let candidates: Vec<Vec<String>> = skus.iter().map(|s| price_lookup_candidates(s)).collect();
    let mut all: Vec<String> = candidates.iter().flatten().cloned().collect();
    all.sort_unstable();
    all.dedup();
    if all.is_empty() {
        return Ok(vec![None; skus.len()]);
    }

    let found: Vec<(String, Decimal)> = sqlx::query_as(
        "SELECT sku, retail_price FROM shop.items WHERE sku = ANY($1) AND NOT is_archived",
    )
    .bind(&all)
    .fetch_all(executor)
    .await?;

    Ok(candidates
        .iter()
        .map(|tries| {
            tries.iter().find_map(|candidate| {
                found
                    .iter()
                    .find(|(sku, _)| sku == candidate)
                    .map(|(sku, price)| PriceMatch {
                        sku: sku.clone(),
                        price: *price,
                    })
            })
        })
        .collect())
}

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active rooms in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        let rows: Vec<RoomRow> = sqlx::query_as(
            r"
            SELECT room_number, room_name, door_label, description, display_order
            FROM shop.rooms
            WHERE is_active
            ORDER BY display_order, room_number
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Room::from).collect())
    }

    /// An active room by number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_room(&self, room_number: i32) -> Result<Option<Room>, RepositoryError> {
        let row: Option<RoomRow> = sqlx::query_as(
            r"
            SELECT room_number, room_name, door_label, description, display_order
            FROM shop.rooms
            WHERE room_number = $1 AND is_active
            ",
        )
        .bind(room_number)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Room::from))
    }

    /// The category a room displays.
    ///
    /// Uses the primary assignment, else the built-in default for the room
    /// number, else `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn room_category(
        &self,
        room_number: i32,
    ) -> Result<Option<Category>, RepositoryError> {
        let assigned: Option<CategoryRow> = sqlx::query_as(
            r"
            SELECT c.id, c.name, c.slug, c.description, c.sort_order
            FROM shop.room_category_assignments a
            JOIN shop.categories c ON c.id = a.category_id
            WHERE a.room_number = $1 AND a.is_primary
            ",
        )
        .bind(room_number)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = assigned {
            return Ok(Some(row.into()));
        }
        match default_room_category(room_number) {
            Some(name) => self.category_by_name(name).await,
            None => Ok(None),
        }
    }

    /// Category by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            r"
            SELECT id, name, slug, description, sort_order
            FROM shop.categories
            WHERE lower(name) = lower($1)
            ",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Visible items in one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_in_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{ITEM_SELECT} {VISIBLE} AND i.category_id = $1 ORDER BY i.name"
        ))
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Every visible item ordered by category then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_visible_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{ITEM_SELECT} {VISIBLE} ORDER BY c.sort_order NULLS LAST, c.name NULLS LAST, i.name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// A visible item by SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(&self, sku: &str) -> Result<Option<Item>, RepositoryError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{ITEM_SELECT} {VISIBLE} AND i.sku = $1"))
            .bind(sku)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Item::from))
    }

    /// Orderable items for a set of exact SKUs (cart rendering).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_by_sku(&self, skus: &[String]) -> Result<Vec<Item>, RepositoryError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{ITEM_SELECT} WHERE i.sku = ANY($1) AND NOT i.is_archived"
        ))
        .bind(skus)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// See [`resolve_prices`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve_prices(
        &self,
        skus: &[String],
    ) -> Result<Vec<Option<PriceMatch>>, RepositoryError> {
        Ok(resolve_prices(self.pool, skus).await?)
    }
}
