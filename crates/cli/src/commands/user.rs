//! Account management.
//!
//! ```bash
//! wf-cli user create -u kermit -e kermit@example.com -p 'lily-pad-42' --admin
//! wf-cli user promote -u kermit
//! ```

use thiserror::Error;

use whimsical_frog_core::UserRole;
use whimsical_frog_storefront::db::{RepositoryError, UserRepository};
use whimsical_frog_storefront::services::{AuthError, AuthService};
use whimsical_frog_storefront::services::auth::Registration;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),

    #[error("No user named {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Register an account with the same validation as the storefront form.
///
/// # Errors
///
/// Returns `UserError::Auth` for invalid input or a taken username/email.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    admin: bool,
) -> Result<(), UserError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;
    let role = if admin { UserRole::Admin } else { UserRole::Customer };

    let user = AuthService::new(&pool)
        .register(
            Registration {
                username: username.to_owned(),
                email: email.to_owned(),
                password: password.to_owned(),
                ..Registration::default()
            },
            role,
        )
        .await?;

    tracing::info!(id = %user.id, username = %user.username, %role, "User created");
    Ok(())
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns `UserError::NotFound` if no account has that username.
pub async fn promote(username: &str) -> Result<(), UserError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;

    let id = UserRepository::new(&pool)
        .set_role_by_username(username, UserRole::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(username.to_owned()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(%id, %username, "User promoted to admin");
    Ok(())
}
