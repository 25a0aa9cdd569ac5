//! Order management.
//!
//! Line edits run in one transaction that ends by re-quoting the order with
//! the current pricing settings, so subtotal, shipping, tax and total always
//! agree with the remaining lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use whimsical_frog_core::order_number::order_item_id;
use whimsical_frog_core::pricing::{PricingSettings, quote, subtotal};
use whimsical_frog_core::sku::price_lookup_candidates;
use whimsical_frog_core::{ShippingMethod, UnknownLabel, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::{
    Address, AvailableItem, LineChange, OrderDetail, OrderFilter, OrderLine, OrderSummary,
    OrderUpdate,
};

/// Largest number of items offered by [`OrderRepository::available_items`].
pub const AVAILABLE_ITEMS_LIMIT: i64 = 50;

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    user_id: UserId,
    customer: String,
    total: Decimal,
    payment_method: String,
    payment_status: String,
    shipping_method: String,
    order_status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let corrupt = |e: UnknownLabel| RepositoryError::DataCorruption(format!("order {}: {e}", row.id));
        Ok(Self {
            payment_method: row.payment_method.parse().map_err(corrupt)?,
            payment_status: row.payment_status.parse().map_err(corrupt)?,
            shipping_method: row.shipping_method.parse().map_err(corrupt)?,
            order_status: row.order_status.parse().map_err(corrupt)?,
            user_id: row.user_id,
            customer: row.customer,
            total: row.total,
            created_at: row.created_at,
            id: row.id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    summary: SummaryRow,
    email: String,
    phone_number: Option<String>,
    address_line1: Option<String>,
    address_line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    shipping_address: Option<Json<Address>>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax_amount: Decimal,
    check_number: Option<String>,
    tracking_number: Option<String>,
    payment_date: Option<NaiveDate>,
    payment_notes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: String,
    sku: String,
    name: String,
    quantity: i32,
    price: Decimal,
    color: Option<String>,
    size: Option<String>,
}

impl From<LineRow> for OrderLine {
    fn from(row: LineRow) -> Self {
        Self {
            id: row.id,
            sku: row.sku,
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            color: row.color,
            size: row.size,
        }
    }
}

const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.user_id,
           COALESCE(NULLIF(concat_ws(' ', u.first_name, u.last_name), ''), u.username) AS customer,
           o.total, o.payment_method, o.payment_status, o.shipping_method, o.order_status,
           o.created_at
    FROM shop.orders o
    JOIN shop.users u ON u.id = o.user_id
";

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders matching every set filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE ($1::date IS NULL OR o.created_at::date = $1)
              AND ($2::text IS NULL OR EXISTS (
                    SELECT 1 FROM shop.order_items oi
                    LEFT JOIN shop.items i ON i.sku = oi.sku
                    WHERE oi.order_id = o.id AND (oi.sku ILIKE $2 OR i.name ILIKE $2)))
              AND ($3::text IS NULL OR o.order_status = $3)
              AND ($4::text IS NULL OR o.payment_method = $4)
              AND ($5::text IS NULL OR o.shipping_method = $5)
              AND ($6::text IS NULL OR o.payment_status = $6)
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(filter.date)
        .bind(filter.item_text.as_deref().map(like_pattern))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.payment_method.map(|s| s.as_str()))
        .bind(filter.shipping_method.map(|s| s.as_str()))
        .bind(filter.payment_status.map(|s| s.as_str()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// The most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            "{SUMMARY_SELECT} ORDER BY o.created_at DESC, o.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// One order with its customer details and lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<OrderDetail>, RepositoryError> {
        let row: Option<DetailRow> = sqlx::query_as(
            r"
            SELECT o.id, o.user_id,
                   COALESCE(NULLIF(concat_ws(' ', u.first_name, u.last_name), ''), u.username) AS customer,
                   o.total, o.payment_method, o.payment_status, o.shipping_method, o.order_status,
                   o.created_at, u.email, u.phone_number, u.address_line1, u.address_line2,
                   u.city, u.state, u.zip_code, o.shipping_address, o.subtotal, o.shipping_cost,
                   o.tax_amount, o.check_number, o.tracking_number, o.payment_date, o.payment_notes
            FROM shop.orders o
            JOIN shop.users u ON u.id = o.user_id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<LineRow> = sqlx::query_as(
            r"
            SELECT oi.id, oi.sku, COALESCE(i.name, oi.sku) AS name, oi.quantity, oi.price,
                   oi.color, oi.size
            FROM shop.order_items oi
            LEFT JOIN shop.items i ON i.sku = oi.sku
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail {
            summary: OrderSummary::try_from(row.summary)?,
            customer_email: row.email,
            customer_phone: row.phone_number,
            address: Address {
                address_line1: row.address_line1,
                address_line2: row.address_line2,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
            },
            shipping_address: row.shipping_address.map(|Json(a)| a),
            subtotal: row.subtotal,
            shipping_cost: row.shipping_cost,
            tax_amount: row.tax_amount,
            check_number: row.check_number,
            tracking_number: row.tracking_number,
            payment_date: row.payment_date,
            payment_notes: row.payment_notes,
            lines: lines.into_iter().map(OrderLine::from).collect(),
        }))
    }

    /// Owner of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn customer_of(&self, id: &str) -> Result<UserId, RepositoryError> {
        sqlx::query_scalar("SELECT user_id FROM shop.orders WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Save header changes. Changing the shipping method re-quotes the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update(
        &self,
        id: &str,
        update: &OrderUpdate,
        settings: &PricingSettings,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let previous: String = sqlx::query_scalar(
            "SELECT shipping_method FROM shop.orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            r"
            UPDATE shop.orders SET
                order_status = $2, payment_status = $3, payment_method = $4,
                shipping_method = $5, tracking_number = $6, payment_date = $7,
                payment_notes = $8, check_number = $9, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.order_status.as_str())
        .bind(update.payment_status.as_str())
        .bind(update.payment_method.as_str())
        .bind(update.shipping_method.as_str())
        .bind(&update.tracking_number)
        .bind(update.payment_date)
        .bind(&update.payment_notes)
        .bind(&update.check_number)
        .execute(&mut *tx)
        .await?;

        if !update.shipping_method.as_str().eq_ignore_ascii_case(&previous) {
            recalculate(&mut tx, id, settings).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add `quantity` of `sku`, merging into an existing line for the same
    /// SKU. Without an explicit `price` the catalog price is used. Returns
    /// what happened and the new order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order or item does not exist.
    pub async fn add_item(
        &self,
        order_id: &str,
        sku: &str,
        quantity: i32,
        price: Option<Decimal>,
        settings: &PricingSettings,
    ) -> Result<(LineChange, Decimal), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_order(&mut tx, order_id).await?;

        let (sku, catalog_price) = resolve_item(&mut tx, sku).await?;
        let price = price.unwrap_or(catalog_price);

        let existing: Option<(String, i32)> = sqlx::query_as(
            "SELECT id, quantity FROM shop.order_items WHERE order_id = $1 AND sku = $2 ORDER BY id LIMIT 1",
        )
        .bind(order_id)
        .bind(&sku)
        .fetch_optional(&mut *tx)
        .await?;

        let change = if let Some((line_id, current)) = existing {
            sqlx::query("UPDATE shop.order_items SET quantity = $2, price = $3 WHERE id = $1")
                .bind(&line_id)
                .bind(current.saturating_add(quantity))
                .bind(price)
                .execute(&mut *tx)
                .await?;
            LineChange::Merged
        } else {
            let seq: i64 = sqlx::query_scalar("SELECT nextval('shop.order_item_seq')")
                .fetch_one(&mut *tx)
                .await?;
            sqlx::query(
                r"
                INSERT INTO shop.order_items (id, order_id, sku, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(order_item_id(u64::try_from(seq).unwrap_or_default()))
            .bind(order_id)
            .bind(&sku)
            .bind(quantity)
            .bind(price)
            .execute(&mut *tx)
            .await?;
            LineChange::Added
        };

        let total = recalculate(&mut tx, order_id, settings).await?;
        tx.commit().await?;
        Ok((change, total))
    }

    /// Remove a line. Returns the new order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not on this order.
    pub async fn remove_item(
        &self,
        order_id: &str,
        item_id: &str,
        settings: &PricingSettings,
    ) -> Result<Decimal, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_order(&mut tx, order_id).await?;

        let result = sqlx::query("DELETE FROM shop.order_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let total = recalculate(&mut tx, order_id, settings).await?;
        tx.commit().await?;
        Ok(total)
    }

    /// Set a line's quantity. Returns the new order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not on this order.
    pub async fn update_quantity(
        &self,
        order_id: &str,
        item_id: &str,
        quantity: i32,
        settings: &PricingSettings,
    ) -> Result<Decimal, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_order(&mut tx, order_id).await?;

        let result =
            sqlx::query("UPDATE shop.order_items SET quantity = $3 WHERE id = $1 AND order_id = $2")
                .bind(item_id)
                .bind(order_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let total = recalculate(&mut tx, order_id, settings).await?;
        tx.commit().await?;
        Ok(total)
    }

    /// Catalog items matching `search` in SKU or name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available_items(&self, search: Option<&str>) -> Result<Vec<AvailableItem>, RepositoryError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(sqlx::query_as(
            r"
            SELECT sku, name, retail_price, image_url
            FROM shop.items
            WHERE NOT is_archived AND ($1::text IS NULL OR sku ILIKE $1 OR name ILIKE $1)
            ORDER BY name
            LIMIT $2
            ",
        )
        .bind(search.map(like_pattern))
        .bind(AVAILABLE_ITEMS_LIMIT)
        .fetch_all(self.pool)
        .await?)
    }
}

/// Lock the order row for the rest of the transaction.
async fn lock_order(tx: &mut Transaction<'_, Postgres>, order_id: &str) -> Result<(), RepositoryError> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM shop.orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?;
    found.map(|_| ()).ok_or(RepositoryError::NotFound)
}

/// Match a SKU (possibly a variant) to a catalog item and its price.
async fn resolve_item(
    tx: &mut Transaction<'_, Postgres>,
    sku: &str,
) -> Result<(String, Decimal), RepositoryError> {
    let candidates = price_lookup_candidates(sku);
    let found: Vec<(String, Decimal)> =
        sqlx::query_as("SELECT sku, retail_price FROM shop.items WHERE sku = ANY($1)")
            .bind(&candidates)
            .fetch_all(&mut **tx)
            .await?;

    candidates
        .iter()
        .find_map(|c| found.iter().find(|(s, _)| s == c).cloned())
        .ok_or(RepositoryError::NotFound)
}

/// Re-quote an order from its lines and store the result. Returns the total.
async fn recalculate(
    tx: &mut Transaction<'_, Postgres>,
    order_id: &str,
    settings: &PricingSettings,
) -> Result<Decimal, RepositoryError> {
    let lines: Vec<(Decimal, i32)> =
        sqlx::query_as("SELECT price, quantity FROM shop.order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&mut **tx)
            .await?;
    let method: String = sqlx::query_scalar("SELECT shipping_method FROM shop.orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;
    let method: ShippingMethod = method
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("order {order_id}: {e}")))?;

    let quote = quote(subtotal(lines), method, settings);
    sqlx::query(
        r"
        UPDATE shop.orders SET
            subtotal = $2, shipping_cost = $3, tax_amount = $4, total = $5, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(order_id)
    .bind(quote.subtotal)
    .bind(quote.shipping)
    .bind(quote.tax)
    .bind(quote.total)
    .execute(&mut **tx)
    .await?;

    Ok(quote.total)
}
