//! Authentication extractor for the back office.
//!
//! The logged-in admin lives in the session as a [`CurrentAdmin`]. Every
//! request re-reads the role from `shop.users`, so demoting or deleting an
//! account takes effect immediately.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::db::CustomerRepository;
use crate::error::set_sentry_user;
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in admin.
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// Rejection for [`RequireAdmin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRejection {
    /// No session: HTML requests go to the login page.
    RedirectToLogin,
    /// Signed in but not an admin: HTML requests go back to the shop.
    RedirectToStorefront(String),
    /// No session on an `/api/` path.
    Unauthorized,
    /// Not an admin on an `/api/` path.
    Forbidden,
    /// The role lookup failed.
    Unavailable,
}

impl AdminRejection {
    fn missing_session(path: &str) -> Self {
        if is_api(path) {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin
        }
    }

    fn not_admin(path: &str, storefront_url: &str) -> Self {
        if is_api(path) {
            Self::Forbidden
        } else {
            Self::RedirectToStorefront(format!("{storefront_url}/"))
        }
    }
}

fn is_api(path: &str) -> bool {
    path.starts_with("/api/")
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::RedirectToStorefront(url) => Redirect::to(&url).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Authentication required" })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "success": false, "message": "Admin privileges required" })),
            )
                .into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_owned();
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AdminRejection::missing_session(&path))?;

        let admin = session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AdminRejection::missing_session(&path))?;

        let role = CustomerRepository::new(state.pool())
            .role_of(admin.id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, admin_id = %admin.id, "Admin role lookup failed");
                AdminRejection::Unavailable
            })?;

        match role {
            Some(role) if role.is_admin() => {
                set_sentry_user(&admin.id, Some(admin.email.as_str()));
                Ok(Self(admin))
            }
            Some(_) => {
                tracing::warn!(admin_id = %admin.id, "Session user is no longer an admin");
                Err(AdminRejection::not_admin(
                    &path,
                    &state.config().storefront_url,
                ))
            }
            None => {
                let _ = session.flush().await;
                Err(AdminRejection::missing_session(&path))
            }
        }
    }
}

/// Store the logged-in admin in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Log out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(response: &Response) -> Option<&str> {
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_missing_session_by_path() {
        assert_eq!(
            AdminRejection::missing_session("/api/categories"),
            AdminRejection::Unauthorized
        );
        assert_eq!(
            AdminRejection::missing_session("/orders"),
            AdminRejection::RedirectToLogin
        );
    }

    #[test]
    fn test_non_admin_goes_to_storefront() {
        let rejection = AdminRejection::not_admin("/inventory", "http://localhost:3000");
        let response = rejection.into_response();
        assert_eq!(location(&response), Some("http://localhost:3000/"));
    }

    #[test]
    fn test_non_admin_api_is_forbidden() {
        let rejection = AdminRejection::not_admin("/api/secrets", "http://localhost:3000");
        assert_eq!(rejection, AdminRejection::Forbidden);
        assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_redirect_to_login() {
        let response = AdminRejection::RedirectToLogin.into_response();
        assert_eq!(location(&response), Some("/auth/login"));
    }
}
