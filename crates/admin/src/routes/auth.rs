//! Back-office login and logout.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::render;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::{CurrentAdmin, session_keys};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub store_name: String,
    pub username: String,
    pub error: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

async fn is_logged_in(session: &Session) -> bool {
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
        .is_some()
}

pub async fn login_page(State(state): State<AppState>, session: Session) -> Response {
    if is_logged_in(&session).await {
        return Redirect::to("/").into_response();
    }
    render(&LoginTemplate {
        store_name: state.config().store_name.clone(),
        username: String::new(),
        error: None,
    })
}

#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let error = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(admin) => {
            if let Err(e) = set_current_admin(&session, &admin).await {
                tracing::error!("Failed to set session: {e}");
                "Could not start a session, please try again".to_owned()
            } else {
                set_sentry_user(&admin.id, Some(admin.email.as_str()));
                tracing::info!(admin_id = %admin.id, "Admin logged in");
                return Redirect::to("/").into_response();
            }
        }
        Err(AuthError::Repository(e)) => {
            tracing::error!("Login lookup failed: {e}");
            "Login is unavailable right now".to_owned()
        }
        Err(e) => {
            tracing::warn!("Admin login rejected: {e}");
            e.to_string()
        }
    };

    render(&LoginTemplate {
        store_name: state.config().store_name.clone(),
        username: form.username,
        error: Some(error),
    })
}

pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    clear_sentry_user();
    Redirect::to("/auth/login")
}
