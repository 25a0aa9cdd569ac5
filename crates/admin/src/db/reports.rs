//! Dashboard figures and sales reports.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{CustomerRepository, InventoryRepository, OrderRepository, RepositoryError};
use crate::models::{Breakdown, DashboardStats, DateRange, Report, TopItem};

/// Rows shown in the dashboard's low-stock and recent-order panels.
const DASHBOARD_LIMIT: i64 = 10;

/// Items listed under "top sellers".
const TOP_ITEMS_LIMIT: i64 = 10;

#[derive(sqlx::FromRow)]
struct TopItemRow {
    sku: String,
    name: String,
    quantity: i64,
    revenue: Decimal,
}

pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Everything the dashboard shows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, RepositoryError> {
        let order_count: i64 = sqlx::query_scalar("SELECT count(*) FROM shop.orders")
            .fetch_one(self.pool)
            .await?;
        let (revenue_ytd, _) = self.year_to_date().await?;

        Ok(DashboardStats {
            order_count,
            revenue_ytd,
            customer_count: CustomerRepository::new(self.pool).count_customers().await?,
            product_count: InventoryRepository::new(self.pool).count_products().await?,
            low_stock: InventoryRepository::new(self.pool)
                .low_stock(DASHBOARD_LIMIT)
                .await?,
            recent_orders: OrderRepository::new(self.pool)
                .recent(DASHBOARD_LIMIT)
                .await?,
        })
    }

    /// Sales report for `range` (inclusive dates).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn report(&self, range: DateRange) -> Result<Report, RepositoryError> {
        let (revenue_ytd, orders_ytd) = self.year_to_date().await?;

        let (revenue_in_range, orders_in_range): (Decimal, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(sum(total), 0), count(*)
            FROM shop.orders
            WHERE created_at::date BETWEEN $1 AND $2
            ",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(self.pool)
        .await?;

        Ok(Report {
            range,
            revenue_ytd,
            orders_ytd,
            customer_count: CustomerRepository::new(self.pool).count_customers().await?,
            product_count: InventoryRepository::new(self.pool).count_products().await?,
            revenue_in_range,
            orders_in_range,
            by_payment_status: self.breakdown("payment_status", range).await?,
            by_payment_method: self.breakdown("payment_method", range).await?,
            top_items: self.top_items(range).await?,
        })
    }

    /// Revenue and order count since January 1st.
    async fn year_to_date(&self) -> Result<(Decimal, i64), RepositoryError> {
        Ok(sqlx::query_as(
            r"
            SELECT COALESCE(sum(total), 0), count(*)
            FROM shop.orders
            WHERE created_at >= date_trunc('year', now())
            ",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Order counts grouped by `column`, which must be a trusted literal.
    async fn breakdown(
        &self,
        column: &'static str,
        range: DateRange,
    ) -> Result<Vec<Breakdown>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            r"
            SELECT {column}, count(*)
            FROM shop.orders
            WHERE created_at::date BETWEEN $1 AND $2
            GROUP BY {column}
            ORDER BY count(*) DESC, {column}
            "
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(label, count)| Breakdown { label, count })
            .collect())
    }

    async fn top_items(&self, range: DateRange) -> Result<Vec<TopItem>, RepositoryError> {
        let rows: Vec<TopItemRow> = sqlx::query_as(
            r"
            SELECT oi.sku, COALESCE(i.name, oi.sku) AS name,
                   sum(oi.quantity)::bigint AS quantity,
                   sum(oi.quantity * oi.price) AS revenue
            FROM shop.order_items oi
            JOIN shop.orders o ON o.id = oi.order_id
            LEFT JOIN shop.items i ON i.sku = oi.sku
            WHERE o.created_at::date BETWEEN $1 AND $2
            GROUP BY oi.sku, i.name
            ORDER BY quantity DESC, oi.sku
            LIMIT $3
            ",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(TOP_ITEMS_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopItem {
                sku: row.sku,
                name: row.name,
                quantity: row.quantity,
                revenue: row.revenue,
            })
            .collect())
    }
}
