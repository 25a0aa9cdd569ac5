//! Authentication route handlers: login, registration and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use whimsical_frog_core::UserRole;

use super::PageContext;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{Address, CurrentUser, User};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl From<RegisterForm> for Registration {
    fn from(form: RegisterForm) -> Self {
        Self {
            username: form.username,
            email: form.email,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
            phone_number: form.phone_number,
            address: Address {
                address_line1: form.address_line1,
                address_line2: form.address_line2,
                city: form.city,
                state: form.state,
                zip_code: form.zip_code,
            },
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub username: String,
    pub error: Option<String>,
}

/// Registration page; re-rendered with the submitted values on error.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub form: RegisterValues,
    pub error: Option<String>,
}

/// Submitted registration values, minus the password.
#[derive(Debug, Clone, Default)]
pub struct RegisterValues {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl From<&RegisterForm> for RegisterValues {
    fn from(form: &RegisterForm) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            username: form.username.clone(),
            email: form.email.clone(),
            first_name: text(&form.first_name),
            last_name: text(&form.last_name),
            phone_number: text(&form.phone_number),
            address_line1: text(&form.address_line1),
            address_line2: text(&form.address_line2),
            city: text(&form.city),
            state: text(&form.state),
            zip_code: text(&form.zip_code),
        }
    }
}

async fn start_session(session: &Session, user: &User) -> Result<(), Response> {
    let current = CurrentUser::from(user);
    if let Err(e) = set_current_user(session, &current).await {
        tracing::error!("Failed to set session: {e}");
        return Err(Redirect::to("/auth/login").into_response());
    }
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        ctx: PageContext::load(&state, &session, None).await,
        username: String::new(),
        error: None,
    }
    .into_response()
}

#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            if let Err(redirect) = start_session(&session, &user).await {
                return redirect;
            }
            tracing::info!(user_id = %user.id, "User logged in");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                tracing::warn!("Login failed");
            } else {
                tracing::error!("Login error: {e}");
            }
            LoginTemplate {
                ctx: PageContext::load(&state, &session, None).await,
                username: form.username,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        ctx: PageContext::load(&state, &session, None).await,
        form: RegisterValues::default(),
        error: None,
    }
    .into_response()
}

/// Create a customer account and log it in.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let values = RegisterValues::from(&form);
    match AuthService::new(state.pool())
        .register(form.into(), UserRole::Customer)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Customer registered");
            if let Err(redirect) = start_session(&session, &user).await {
                return redirect;
            }
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            RegisterTemplate {
                ctx: PageContext::load(&state, &session, None).await,
                form: values,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}
