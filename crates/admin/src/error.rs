//! Unified error handling for the back office.
//!
//! Page handlers return `Result<T, AppError>`; JSON handlers return
//! `Result<T, ApiError>`, which renders `{"success": false, "message": ...}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use whimsical_frog_core::marketing::MarketingError;

use crate::db::RepositoryError;
use crate::models::{ItemInputError, OrderUpdateError};
use crate::services::{AuthError, EmailError, SecretsError};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error(transparent)]
    Marketing(#[from] MarketingError),

    #[error(transparent)]
    Item(#[from] ItemInputError),

    #[error(transparent)]
    OrderUpdate(#[from] OrderUpdateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) => !matches!(
                err,
                RepositoryError::NotFound
                    | RepositoryError::Conflict(_)
                    | RepositoryError::Invalid(_)
            ),
            Self::Auth(err) => matches!(err, AuthError::Repository(_)),
            Self::Secrets(err) => !err.is_client_error(),
            Self::Email(err) => !matches!(err, EmailError::InvalidAddress(_)),
            Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound)
            | Self::Secrets(SecretsError::Repository(RepositoryError::NotFound))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Auth(AuthError::InvalidCredentials) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::NotAdmin) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Email(EmailError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Email(_) if self.is_server_error() => StatusCode::BAD_GATEWAY,
            _ if self.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Email(EmailError::NotConfigured) => return "Email is not configured".to_owned(),
            Self::Email(_) if self.is_server_error() => {
                return "Failed to send email".to_owned();
            }
            _ if self.is_server_error() => return "Internal server error".to_owned(),
            _ => {}
        }
        match self {
            Self::Database(RepositoryError::NotFound)
            | Self::Secrets(SecretsError::Repository(RepositoryError::NotFound)) => {
                "Not found".to_owned()
            }
            Self::Database(RepositoryError::Conflict(msg) | RepositoryError::Invalid(msg))
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Auth(err) => err.to_string(),
            Self::Secrets(err) => err.to_string(),
            Self::Email(err) => err.to_string(),
            Self::Marketing(err) => err.to_string(),
            Self::Item(err) => err.to_string(),
            Self::OrderUpdate(err) => err.to_string(),
            _ => self.to_string(),
        }
    }

    fn capture(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.capture();
        (self.status(), self.public_message()).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Error for JSON endpoints.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// A 400 with `message`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(AppError::BadRequest(message.into()))
    }

    /// A 404 with `message`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(AppError::NotFound(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.capture();
        let body = json!({
            "success": false,
            "message": self.0.public_message(),
        });
        (self.0.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for JSON handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("07C15U01".to_string());
        assert_eq!(err.to_string(), "Not found: 07C15U01");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("dup".to_owned()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(MarketingError::InvalidField.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(EmailError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("order 1".to_owned()));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_api_error_body() {
        let (status, body) = body(ApiError::from(MarketingError::InvalidField)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid field name.");
    }

    #[tokio::test]
    async fn test_api_invalid_input_is_bad_request() {
        let err = RepositoryError::Invalid("SKU code must be 1-4 letters".to_owned());
        let (status, body) = body(ApiError::from(err)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "SKU code must be 1-4 letters");
    }

    #[tokio::test]
    async fn test_api_conflict_message_passes_through() {
        let err = RepositoryError::Conflict("Category in use; provide reassign_to".to_owned());
        let (status, body) = body(ApiError::from(err)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Category in use; provide reassign_to");
    }
}
