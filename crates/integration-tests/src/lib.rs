//! Integration tests for WhimsicalFrog.
//!
//! The tests in `tests/` talk to running servers and a migrated database,
//! so they are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! wf-cli migrate all
//! cargo run -p whimsical-frog-storefront &
//! cargo run -p whimsical-frog-admin &
//! cargo test -p whimsical-frog-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `DATABASE_URL` - Shared `PostgreSQL` database
//! - `STOREFRONT_BASE_URL` - Default `http://localhost:3000`
//! - `ADMIN_BASE_URL` - Default `http://localhost:3001`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use reqwest::{Client, StatusCode, redirect::Policy};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use whimsical_frog_core::UserRole;
use whimsical_frog_storefront::services::AuthService;
use whimsical_frog_storefront::services::auth::Registration;

pub const TEST_PASSWORD: &str = "lily-pad-42";

#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

#[must_use]
pub fn admin_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_owned())
}

/// A client with a cookie jar that reports redirects instead of following them.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// # Panics
///
/// Panics if `DATABASE_URL` is unset or the database is unreachable.
pub async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    whimsical_frog_storefront::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database")
}

/// `prefix` plus a short random suffix, for rows that must not collide
/// between runs.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", id.get(..10).unwrap_or(&id))
}

/// Register an account and return its username.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn create_user(pool: &PgPool, role: UserRole) -> String {
    let username = unique("frog");
    AuthService::new(pool)
        .register(
            Registration {
                username: username.clone(),
                email: format!("{username}@example.com"),
                password: TEST_PASSWORD.to_owned(),
                ..Registration::default()
            },
            role,
        )
        .await
        .expect("Failed to register test user");
    username
}

/// Log `username` into the admin panel.
///
/// # Panics
///
/// Panics unless the login redirects to the dashboard.
pub async fn admin_login(client: &Client, username: &str) {
    let resp = client
        .post(format!("{}/auth/login", admin_url()))
        .form(&[("username", username), ("password", TEST_PASSWORD)])
        .send()
        .await
        .expect("Login request failed");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/")
    );
}

/// A client logged in as a fresh admin.
pub async fn admin_client(pool: &PgPool) -> Client {
    let username = create_user(pool, UserRole::Admin).await;
    let client = client();
    admin_login(&client, &username).await;
    client
}
