//! Back-office login.
//!
//! Admins are `shop.users` rows with the `admin` role; passwords are the
//! Argon2id hashes written by the storefront.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use sqlx::PgPool;
use thiserror::Error;

use whimsical_frog_core::{Email, UserRole, Username};

use crate::db::{CustomerRepository, RepositoryError};
use crate::models::CurrentAdmin;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Correct password, but the account is not an admin.
    #[error("Admin privileges required")]
    NotAdmin,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct AuthService<'a> {
    users: CustomerRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: CustomerRepository::new(pool),
        }
    }

    /// Check credentials and the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for unknown users or wrong
    /// passwords and `AuthError::NotAdmin` for valid non-admin accounts.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<CurrentAdmin, AuthError> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let creds = self
            .users
            .credentials(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &creds.password_hash)?;

        let role: UserRole = creds.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("user {}: {e}", creds.id))
        })?;
        if !role.is_admin() {
            return Err(AuthError::NotAdmin);
        }

        let username = Username::parse(&creds.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username for user {}: {e}", creds.id))
        })?;
        let email = Email::parse(&creds.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for user {}: {e}", creds.id))
        })?;
        let name = display_name(creds.first_name.as_deref(), creds.last_name.as_deref())
            .unwrap_or_else(|| username.as_str().to_owned());

        Ok(CurrentAdmin {
            id: creds.id,
            username,
            email,
            name,
        })
    }
}

fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(name).filter(|n| !n.is_empty())
}

/// Verify a password against a stored PHC hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    #[test]
    fn test_verify_password() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"lily-pad-42", &salt)
            .unwrap()
            .to_string();
        assert!(verify_password("lily-pad-42", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(verify_password("x", "garbage").is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("Kermit"), Some(" ")), Some("Kermit".to_owned()));
        assert_eq!(display_name(None, None), None);
        assert_eq!(
            display_name(Some("Kermit"), Some("Frog")),
            Some("Kermit Frog".to_owned())
        );
    }
}
