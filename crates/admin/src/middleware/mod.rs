//! HTTP middleware stack for the admin panel.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Session layer (tower-sessions with `PostgreSQL` store, `SameSite=Strict`)
//! 4. Security headers
//!
//! Authorization is the [`RequireAdmin`] extractor on each handler.

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{AdminRejection, RequireAdmin, clear_current_admin, set_current_admin};
pub use security_headers::security_headers_middleware;
pub use session::{SessionStoreError, create_session_layer};
