//! Account page: profile, password and order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageContext, with_message};
use crate::db::OrderRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{Address, CurrentUser, Order, User};
use crate::services::auth::{AuthError, AuthService, PasswordChange, ProfileInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Profile form, shared by the page and `/api/account`.
#[derive(Debug, Default, Deserialize)]
pub struct AccountForm {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl AccountForm {
    fn profile(&self) -> ProfileInput {
        ProfileInput {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: self.phone_number.clone(),
            address: Address {
                address_line1: self.address_line1.clone(),
                address_line2: self.address_line2.clone(),
                city: self.city.clone(),
                state: self.state.clone(),
                zip_code: self.zip_code.clone(),
            },
        }
    }

    fn wants_password_change(&self) -> bool {
        !self.new_password.is_empty()
    }

    fn password_change(&self) -> Option<PasswordChange<'_>> {
        self.wants_password_change().then(|| PasswordChange {
            current: &self.current_password,
            new_password: &self.new_password,
            confirmation: &self.confirm_password,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub ctx: PageContext,
    pub profile: User,
    pub orders: Vec<Order>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Apply a profile update (and optional password change), refreshing the
/// session copy of the user.
///
/// # Errors
///
/// Returns `AuthError` for invalid input or a wrong current password.
pub async fn apply_update(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    form: &AccountForm,
) -> std::result::Result<User, AuthError> {
    let updated = AuthService::new(state.pool())
        .update_account(user.id, form.profile(), form.password_change())
        .await?;
    if form.wants_password_change() {
        tracing::info!(user_id = %user.id, "Password changed");
    }
    if let Err(e) = set_current_user(session, &CurrentUser::from(&updated)).await {
        tracing::error!("Failed to refresh session user: {e}");
    }
    Ok(updated)
}

#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let profile = AuthService::new(state.pool()).get_user(user.id).await?;
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(AccountTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        profile,
        orders,
        error: query.error,
        success: query.success,
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Response {
    match apply_update(&state, &session, &user, &form).await {
        Ok(_) => Redirect::to(&with_message("/account", "success", "Account updated")).into_response(),
        Err(e) => {
            tracing::warn!("Account update failed: {e}");
            Redirect::to(&with_message("/account", "error", &e.user_message())).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_change_only_when_requested() {
        let form = AccountForm {
            email: "frog@example.com".to_owned(),
            ..AccountForm::default()
        };
        assert!(!form.wants_password_change());

        assert!(form.password_change().is_none());

        let form = AccountForm {
            current_password: "old-lilypad".to_owned(),
            new_password: "lilypad-42".to_owned(),
            confirm_password: "lilypad-42".to_owned(),
            ..form
        };
        assert!(form.wants_password_change());
        let change = form.password_change().unwrap();
        assert_eq!(change.current, "old-lilypad");
        assert_eq!(change.confirmation, "lilypad-42");
    }

    #[test]
    fn test_profile_copies_address() {
        let form = AccountForm {
            email: "frog@example.com".to_owned(),
            city: Some("Pondville".to_owned()),
            ..AccountForm::default()
        };
        let profile = form.profile();
        assert_eq!(profile.address.city.as_deref(), Some("Pondville"));
        assert_eq!(profile.email, "frog@example.com");
    }
}
