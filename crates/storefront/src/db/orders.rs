//! Order persistence.
//!
//! Placing an order is a single transaction: an advisory lock serializes id
//! allocation, line prices are read from `shop.items`, stock is decremented
//! (never below zero) and the totals are computed server-side.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use whimsical_frog_core::order_number::{next_order_id, order_item_id, order_prefix};
use whimsical_frog_core::pricing::{PricingSettings, Quote, quote, subtotal};
use whimsical_frog_core::{PaymentStatus, UserId};

use super::RepositoryError;
use super::catalog::resolve_prices;
use crate::models::{NewOrder, NewOrderLine, Order, OrderLine};

/// Advisory lock key held while allocating order ids.
const ORDER_ID_LOCK: i64 = 0x5746_4f52_4445_5253;

/// An item whose stock fell to or below its reorder point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStock {
    pub sku: String,
    pub stock_level: i32,
    pub reorder_point: i32,
}

/// Why an order could not be placed.
#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// No catalog item matches the SKU or any of its base SKUs.
    #[error("Unknown item: {0}")]
    UnknownSku(String),

    #[error(transparent)]
    OrderNumber(#[from] whimsical_frog_core::order_number::OrderNumberError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub id: String,
    pub quote: Quote,
    pub low_stock: Vec<LowStock>,
}

/// A line after its SKU has been matched to a catalog item.
struct PricedLine<'a> {
    line: &'a NewOrderLine,
    sku: String,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: i32,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax_amount: Decimal,
    total: Decimal,
    payment_method: String,
    check_number: Option<String>,
    payment_status: String,
    shipping_method: String,
    order_status: String,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let corrupt =
            |e: whimsical_frog_core::UnknownLabel| RepositoryError::DataCorruption(format!("order {}: {e}", self.id));
        Ok(Order {
            payment_method: self.payment_method.parse().map_err(corrupt)?,
            payment_status: self.payment_status.parse().map_err(corrupt)?,
            shipping_method: self.shipping_method.parse().map_err(corrupt)?,
            order_status: self.order_status.parse().map_err(corrupt)?,
            user_id: UserId::new(self.user_id),
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            tax_amount: self.tax_amount,
            total: self.total,
            check_number: self.check_number,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            id: self.id,
            lines,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: String,
    sku: String,
    name: String,
    quantity: i32,
    price: Decimal,
    color: Option<String>,
    size: Option<String>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
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

const ORDER_COLUMNS: &str = r"
    id, user_id, subtotal, shipping_cost, tax_amount, total, payment_method,
    check_number, payment_status, shipping_method, order_status, tracking_number, created_at
";

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// Any failure rolls the whole order back.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::UnknownSku` if a line matches no item,
    /// `PlaceOrderError::OrderNumber` if no order number is left for today's
    /// prefix, and `PlaceOrderError::Repository` for database failures.
    pub async fn place(
        &self,
        order: &NewOrder,
        settings: &PricingSettings,
        today: NaiveDate,
    ) -> Result<PlacedOrder, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ORDER_ID_LOCK)
            .execute(&mut *tx)
            .await?;

        let requested: Vec<String> = order.lines.iter().map(|l| l.sku.clone()).collect();
        let matches = resolve_prices(&mut *tx, &requested).await?;
        let priced = order
            .lines
            .iter()
            .zip(matches)
            .map(|(line, found)| {
                found
                    .map(|m| PricedLine {
                        line,
                        sku: m.sku,
                        price: m.price,
                    })
                    .ok_or_else(|| PlaceOrderError::UnknownSku(line.sku.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let subtotal = subtotal(priced.iter().map(|p| (p.price, p.line.quantity)));
        let quote = quote(subtotal, order.shipping_method, settings);

        let prefix = order_prefix(order.user_id, today, order.shipping_method);
        let highest: Option<String> = sqlx::query_scalar(
            "SELECT id FROM shop.orders WHERE id LIKE $1 || '%' ORDER BY id DESC LIMIT 1",
        )
        .bind(&prefix)
        .fetch_optional(&mut *tx)
        .await?;
        let order_id = next_order_id(&prefix, highest.as_deref())?;

        sqlx::query(
            r"
            INSERT INTO shop.orders (
                id, user_id, subtotal, shipping_cost, tax_amount, total,
                payment_method, check_number, payment_status, shipping_method,
                shipping_address, order_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(&order_id)
        .bind(order.user_id)
        .bind(quote.subtotal)
        .bind(quote.shipping)
        .bind(quote.tax)
        .bind(quote.total)
        .bind(order.payment_method.as_str())
        .bind(&order.check_number)
        .bind(PaymentStatus::default().as_str())
        .bind(order.shipping_method.as_str())
        .bind(order.shipping_address.as_ref().map(Json))
        .bind(order.payment_method.initial_order_status().as_str())
        .execute(&mut *tx)
        .await?;

        for p in &priced {
            let seq: i64 = sqlx::query_scalar("SELECT nextval('shop.order_item_seq')")
                .fetch_one(&mut *tx)
                .await?;
            let item_id = order_item_id(u64::try_from(seq).unwrap_or_default());

            sqlx::query(
                r"
                INSERT INTO shop.order_items (id, order_id, sku, quantity, price, color, size)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(&item_id)
            .bind(&order_id)
            .bind(&p.sku)
            .bind(p.line.quantity)
            .bind(p.price)
            .bind(&p.line.color)
            .bind(&p.line.size)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r"
                UPDATE shop.items
                SET stock_level = GREATEST(stock_level - $2, 0), updated_at = now()
                WHERE sku = $1
                ",
            )
            .bind(&p.sku)
            .bind(p.line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let skus: Vec<String> = priced.iter().map(|p| p.sku.clone()).collect();
        let low_stock = self.low_stock(&skus).await?;

        Ok(PlacedOrder {
            id: order_id,
            quote,
            low_stock,
        })
    }

    /// Items among `skus` at or below their reorder point.
    async fn low_stock(&self, skus: &[String]) -> Result<Vec<LowStock>, RepositoryError> {
        let rows: Vec<(String, i32, i32)> = sqlx::query_as(
            r"
            SELECT sku, stock_level, reorder_point FROM shop.items
            WHERE sku = ANY($1) AND stock_level <= reorder_point
            ORDER BY sku
            ",
        )
        .bind(skus)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sku, stock_level, reorder_point)| LowStock {
                sku,
                stock_level,
                reorder_point,
            })
            .collect())
    }

    /// Orders placed by a user, newest first, without lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_order(Vec::new()))
            .collect()
    }

    /// One order with its lines, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: &str,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<OrderLineRow> = sqlx::query_as(
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

        row.into_order(lines.into_iter().map(OrderLine::from).collect())
            .map(Some)
    }
}
