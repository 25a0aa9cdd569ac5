//! HTTP route handlers for the admin panel.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database)
//!
//! # Auth
//! GET  /auth/login                     - Login page
//! POST /auth/login                     - Login action
//! POST /auth/logout                    - Logout
//!
//! # Pages (admin only)
//! GET  /                               - Dashboard
//! GET  /inventory                      - Items (search, category, archived)
//! GET  /inventory/new                  - New item form
//! POST /inventory                      - Create item
//! GET  /inventory/{sku}/edit           - Edit item form
//! POST /inventory/{sku}                - Update item
//! POST /inventory/{sku}/archive        - Archive item
//! POST /inventory/{sku}/restore        - Restore item
//! GET  /categories                     - Categories and SKU rules
//! GET  /rooms                          - Rooms and assignments
//! GET  /orders                         - Orders (filters)
//! GET  /orders/{id}                    - Order detail
//! POST /orders/{id}                    - Update order header
//! POST /orders/{id}/delete             - Delete order
//! GET  /customers                      - Customers (search)
//! POST /customers/{id}/role            - Change role
//! POST /customers/{id}/delete          - Delete customer
//! GET  /marketing                      - Items with marketing copy
//! GET  /marketing/{sku}                - Marketing editor
//! GET  /reports                        - Sales report
//! GET  /secrets                        - Secret key names
//! GET  /settings                       - Pricing settings
//! POST /settings                       - Save pricing settings
//!
//! # JSON API (admin only)
//! POST   /api/inventory/{sku}/stock    - Set stock level
//! GET    /api/categories               - List categories
//! POST   /api/categories               - add / rename / delete / reorder
//! GET    /api/sku-rules                - List SKU rules
//! POST   /api/sku-rules                - Upsert SKU rule
//! DELETE /api/sku-rules/{id}           - Delete SKU rule
//! POST   /api/rooms                    - Upsert room
//! DELETE /api/rooms/{room_number}      - Deactivate or delete room
//! GET    /api/room-assignments         - List assignments
//! POST   /api/room-assignments         - Assign category to room
//! DELETE /api/room-assignments/{id}    - Remove assignment
//! POST   /api/orders/{id}/items        - add_item / remove_item / update_quantity
//! POST   /api/orders/{id}/address      - Update customer address
//! POST   /api/orders/{id}/receipt      - Email receipt
//! GET    /api/items/available          - Items for the add-line picker
//! GET    /api/marketing/{sku}          - Marketing copy
//! POST   /api/marketing/{sku}          - update_field / bulk_update / add_list_item / remove_list_item
//! POST   /api/secrets                  - Store secrets
//! DELETE /api/secrets/{key}            - Delete secret
//! POST   /api/secrets/rotate           - Re-encrypt under the current key
//! GET    /api/secrets/export           - Decrypted key/value map
//! ```

pub mod auth;
pub mod categories;
pub mod customers;
pub mod dashboard;
pub mod inventory;
pub mod marketing;
pub mod orders;
pub mod reports;
pub mod rooms;
pub mod secrets;
pub mod settings;

use askama::Template;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::Span;

use crate::middleware::security_headers_middleware;
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Data every page layout needs.
#[derive(Debug, Clone)]
pub struct Layout {
    pub store_name: String,
    pub admin_name: String,
    pub current_path: &'static str,
}

impl Layout {
    #[must_use]
    pub fn new(state: &AppState, admin: &CurrentAdmin, current_path: &'static str) -> Self {
        Self {
            store_name: state.config().store_name.clone(),
            admin_name: admin.name.clone(),
            current_path,
        }
    }

    /// Whether the nav entry for `section` is the current page.
    #[must_use]
    pub fn is_active(&self, section: &str) -> bool {
        if section == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(section)
        }
    }
}

/// `?success=` / `?error=` messages carried across a redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Append a flash-style message to a redirect target.
#[must_use]
pub fn with_message(path: &str, key: &str, message: &str) -> String {
    format!("{path}?{key}={}", urlencoding::encode(message))
}

/// Render a page, logging template failures as a 500.
pub fn render(template: &impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// All admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(inventory::router())
        .merge(categories::router())
        .merge(rooms::router())
        .merge(orders::router())
        .merge(customers::router())
        .merge(marketing::router())
        .merge(reports::router())
        .merge(secrets::router())
        .merge(settings::router())
}

/// The full application: routes, static files and middleware.
pub fn app(state: AppState, session_layer: SessionManagerLayer<PostgresStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new("crates/admin/static"))
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
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

    fn layout(path: &'static str) -> Layout {
        Layout {
            store_name: "WhimsicalFrog".to_owned(),
            admin_name: "Frog Admin".to_owned(),
            current_path: path,
        }
    }

    #[test]
    fn test_with_message_encodes() {
        assert_eq!(
            with_message("/inventory", "success", "Item archived"),
            "/inventory?success=Item%20archived"
        );
    }

    #[test]
    fn test_layout_active_section() {
        assert!(layout("/").is_active("/"));
        assert!(!layout("/orders").is_active("/"));
        assert!(layout("/orders").is_active("/orders"));
        assert!(!layout("/orders").is_active("/inventory"));
    }
}
