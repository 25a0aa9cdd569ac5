//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page (room doors)
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database)
//!
//! # Catalog
//! GET  /shop                   - All items by category
//! GET  /rooms/{room_number}    - Room page
//! GET  /items/{sku}            - Item detail
//!
//! # Cart (session)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a line
//! POST /cart/update            - Set quantity (0 removes)
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Item count (JSON)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Review and pay
//! POST /checkout               - Place order
//! GET  /orders/{id}            - Receipt (owner only)
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile and order history
//! POST /account                - Update profile / password
//!
//! # JSON API
//! POST /api/account            - Update profile / password
//! POST /api/checkout/pricing   - Quote items
//! POST /api/orders             - Place an order
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod rooms;
pub mod shop;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::Span;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::models::{Cart, CurrentUser, session_keys};
use crate::state::AppState;

/// Data every page layout needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub store_name: String,
    pub user: Option<CurrentUser>,
    pub cart_count: i32,
}

impl PageContext {
    /// Build the layout context from the session.
    pub async fn load(state: &AppState, session: &Session, user: Option<CurrentUser>) -> Self {
        let cart_count = load_cart(session).await.item_count();
        Self {
            store_name: state.config().store_name.clone(),
            user,
            cart_count,
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    #[must_use]
    pub fn greeting(&self) -> &str {
        self.user.as_ref().map_or("", CurrentUser::display_name)
    }
}

/// Read the session cart. A missing or unreadable cart is empty.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Write the session cart back.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Append a flash-style message to a redirect target.
#[must_use]
pub fn with_message(path: &str, key: &str, message: &str) -> String {
    format!("{path}?{key}={}", urlencoding::encode(message))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/account", post(api::account::update))
        .route("/checkout/pricing", post(api::checkout::pricing))
        .route("/orders", post(api::checkout::create_order))
        .layer(api_rate_limiter())
}

/// All storefront routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/shop", get(shop::index))
        .route("/items/{sku}", get(shop::item))
        .route("/rooms/{room_number}", get(rooms::show))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .route("/orders/{id}", get(checkout::order))
        .route("/account", get(account::index).post(account::update))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}

/// The full application: routes, static files and middleware.
pub fn app(state: AppState, session_layer: SessionManagerLayer<PostgresStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new("crates/storefront/static"))
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers outermost for full request coverage
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness: the process is up.
async fn health() -> &'static str {
    "ok"
}

/// Readiness: the database answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_message_encodes() {
        assert_eq!(
            with_message("/account", "error", "Invalid email address"),
            "/account?error=Invalid%20email%20address"
        );
    }
}
