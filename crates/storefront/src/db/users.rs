//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use whimsical_frog_core::{Email, UserId, UserRole, Username};

use super::RepositoryError;
use crate::models::{Address, NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = r"
    id, username, email, role, first_name, last_name, phone_number,
    address_line1, address_line2, city, state, zip_code, created_at
";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
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
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username for user {}: {e}", row.id))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for user {}: {e}", row.id))
        })?;
        let role = row.role.parse::<UserRole>().map_err(|e| {
            RepositoryError::DataCorruption(format!("user {}: {e}", row.id))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username,
            email,
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
            created_at: row.created_at,
        })
    }
}

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM shop.users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    /// Look a user up by username or email (case-insensitive) and return the
    /// user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_with_password_hash(
        &self,
        identifier: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(i32, String)> = sqlx::query_as(
            r"
            SELECT id, password_hash FROM shop.users
            WHERE lower(username) = lower($1) OR lower(email) = lower($1)
            ORDER BY (lower(username) = lower($1)) DESC
            LIMIT 1
            ",
        )
        .bind(identifier.trim())
        .fetch_optional(self.pool)
        .await?;

        let Some((id, hash)) = row else {
            return Ok(None);
        };
        let user = self
            .get_by_id(UserId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(Some((user, hash)))
    }

    /// Password hash for a known user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn get_password_hash(&self, id: UserId) -> Result<String, RepositoryError> {
        sqlx::query_scalar("SELECT password_hash FROM shop.users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email is taken.
    pub async fn create(
        &self,
        user: &NewUser,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.users (
                username, email, password_hash, role, first_name, last_name, phone_number,
                address_line1, address_line2, city, state, zip_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.username.as_str())
        .bind(&user.email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.address.address_line1)
        .bind(&user.address.address_line2)
        .bind(&user.address.city)
        .bind(&user.address.state)
        .bind(&user.address.zip_code)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "Username or email already exists"))?;

        User::try_from(row)
    }

    /// Update profile fields and, when `password_hash` is given, the password.
    ///
    /// Both change in one statement, so a rejected email leaves the password
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email belongs to another user.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
        password_hash: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.users SET
                email = $2, first_name = $3, last_name = $4, phone_number = $5,
                address_line1 = $6, address_line2 = $7, city = $8, state = $9, zip_code = $10,
                password_hash = COALESCE($11, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .bind(&update.address.address_line1)
        .bind(&update.address.address_line2)
        .bind(&update.address.city)
        .bind(&update.address.state)
        .bind(&update.address.zip_code)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "Email already in use"))?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(User::try_from)
    }

    /// Change a user's role, looked up by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn set_role_by_username(
        &self,
        username: &str,
        role: UserRole,
    ) -> Result<UserId, RepositoryError> {
        sqlx::query_scalar(
            r"
            UPDATE shop.users SET role = $2, updated_at = now()
            WHERE lower(username) = lower($1)
            RETURNING id
            ",
        )
        .bind(username)
        .bind(role.as_str())
        .fetch_optional(self.pool)
        .await?
        .map(UserId::new)
        .ok_or(RepositoryError::NotFound)
    }
}
