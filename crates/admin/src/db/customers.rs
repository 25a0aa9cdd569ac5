//! Customer accounts as seen from the back office.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use whimsical_frog_core::{UserId, UserRole};

use super::{RepositoryError, like_pattern};
use crate::models::{Address, Customer};

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: UserId,
    username: String,
    email: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
    address_line1: Option<String>,
    address_line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    order_count: i64,
    total_spent: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| RepositoryError::DataCorruption(format!("user {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            address: Address {
                address_line1: row.address_line1,
                address_line2: row.address_line2,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
            },
            order_count: row.order_count,
            total_spent: row.total_spent,
            created_at: row.created_at,
        })
    }
}

const CUSTOMER_SELECT: &str = r"
    SELECT u.id, u.username, u.email, u.role, u.first_name, u.last_name, u.phone_number,
           u.address_line1, u.address_line2, u.city, u.state, u.zip_code,
           count(o.id) AS order_count,
           COALESCE(sum(o.total), 0) AS total_spent,
           u.created_at
    FROM shop.users u
    LEFT JOIN shop.orders o ON o.user_id = u.id
";

/// A back-office login candidate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credentials {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
}

pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look a user up by username or email for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials(&self, identifier: &str) -> Result<Option<Credentials>, RepositoryError> {
        let row = sqlx::query_as(
            r"
            SELECT id, username, email, role, first_name, last_name, password_hash
            FROM shop.users
            WHERE lower(username) = lower($1) OR lower(email) = lower($1)
            ORDER BY (lower(username) = lower($1)) DESC
            LIMIT 1
            ",
        )
        .bind(identifier.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Customers matching `search` in username, email or name, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Customer>, RepositoryError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            r"
            {CUSTOMER_SELECT}
            WHERE $1::text IS NULL
               OR u.username ILIKE $1 OR u.email ILIKE $1
               OR concat_ws(' ', u.first_name, u.last_name) ILIKE $1
            GROUP BY u.id
            ORDER BY u.created_at DESC
            "
        ))
        .bind(search.map(like_pattern))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    /// Total number of accounts with the customer role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_customers(&self) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT count(*) FROM shop.users WHERE role = $1")
                .bind(UserRole::Customer.as_str())
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// Current role of a user, `None` if the account is gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` for an unknown stored role.
    pub async fn role_of(&self, id: UserId) -> Result<Option<UserRole>, RepositoryError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM shop.users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        role.map(|r| {
            r.parse::<UserRole>()
                .map_err(|e| RepositoryError::DataCorruption(format!("user {id}: {e}")))
        })
        .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.users SET role = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(role.as_str())
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an account that has never ordered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when `id` is the acting admin or
    /// has orders, `RepositoryError::NotFound` if it does not exist.
    pub async fn delete(&self, id: UserId, acting: UserId) -> Result<(), RepositoryError> {
        if id == acting {
            return Err(RepositoryError::Conflict(
                "You cannot delete your own account".to_owned(),
            ));
        }

        let orders: i64 = sqlx::query_scalar("SELECT count(*) FROM shop.orders WHERE user_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        if orders > 0 {
            return Err(RepositoryError::Conflict(
                "Customer has orders and cannot be deleted".to_owned(),
            ));
        }

        let result = sqlx::query("DELETE FROM shop.users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_foreign_key(e, "Customer has orders and cannot be deleted")
            })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace a user's stored address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_address(&self, id: UserId, address: &Address) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.users SET
                address_line1 = $2, address_line2 = $3, city = $4, state = $5, zip_code = $6,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&address.address_line1)
        .bind(&address.address_line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
