//! Authentication service.
//!
//! Password registration and login against `shop.users`. Hashes are
//! Argon2id in PHC string format.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use whimsical_frog_core::{Email, UserId, UserRole, Username};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{Address, NewUser, ProfileUpdate, User, non_blank};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw registration form input.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
}

/// Raw profile form input.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
}

/// A requested password change from the account form.
#[derive(Debug, Clone, Copy)]
pub struct PasswordChange<'p> {
    pub current: &'p str,
    pub new_password: &'p str,
    pub confirmation: &'p str,
}

pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` / `InvalidUsername` for malformed input,
    /// `AuthError::WeakPassword` for short passwords and
    /// `AuthError::UserAlreadyExists` if the username or email is taken.
    pub async fn register(
        &self,
        registration: Registration,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let username = Username::parse(&registration.username)?;
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let new_user = NewUser {
            username,
            email,
            first_name: non_blank(registration.first_name),
            last_name: non_blank(registration.last_name),
            phone_number: non_blank(registration.phone_number),
            address: normalize_address(registration.address),
        };

        self.users
            .create(&new_user, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Log in with username or email plus password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user is unknown or the
    /// password is wrong.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let (user, password_hash) = self
            .users
            .get_with_password_hash(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        Ok(user)
    }

    /// Update the profile of `user_id`, optionally changing the password.
    ///
    /// Every check runs before anything is written; the profile and the
    /// password are then stored together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email,
    /// `AuthError::InvalidCredentials` if the current password is wrong,
    /// `AuthError::PasswordMismatch` if the confirmation differs,
    /// `AuthError::WeakPassword` if the new password is too short and
    /// `AuthError::UserAlreadyExists` if another account uses the email.
    pub async fn update_account(
        &self,
        user_id: UserId,
        input: ProfileInput,
        password: Option<PasswordChange<'_>>,
    ) -> Result<User, AuthError> {
        let update = ProfileUpdate {
            email: Email::parse(&input.email)?,
            first_name: non_blank(input.first_name),
            last_name: non_blank(input.last_name),
            phone_number: non_blank(input.phone_number),
            address: normalize_address(input.address),
        };

        let new_hash = match password {
            Some(change) => {
                let hash = self.users.get_password_hash(user_id).await?;
                verify_password(change.current, &hash)?;
                if change.new_password != change.confirmation {
                    return Err(AuthError::PasswordMismatch);
                }
                validate_password(change.new_password)?;
                Some(hash_password(change.new_password)?)
            }
            None => None,
        };

        self.users
            .update_profile(user_id, &update, new_hash.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Reload a user, e.g. to refresh session data.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user no longer exists.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

fn normalize_address(address: Address) -> Address {
    Address {
        address_line1: non_blank(address.address_line1),
        address_line2: non_blank(address.address_line2),
        city: non_blank(address.city),
        state: non_blank(address.state),
        zip_code: non_blank(address.zip_code),
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
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

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("ribbit-ribbit").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("ribbit-ribbit", &hash).is_ok());
        assert!(matches!(
            verify_password("croak-croak", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_normalize_address_blanks() {
        let address = normalize_address(Address {
            address_line1: Some(" 12 Lily Pad Ln ".to_owned()),
            city: Some("  ".to_owned()),
            ..Address::default()
        });
        assert_eq!(address.address_line1.as_deref(), Some("12 Lily Pad Ln"));
        assert_eq!(address.city, None);
    }
}
