//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] whimsical_frog_core::EmailError),

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] whimsical_frog_core::UsernameError),

    /// Wrong password or unknown user. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// New password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show on a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Invalid email address".to_owned(),
            Self::InvalidUsername(e) => capitalize(&e.to_string()),
            Self::InvalidCredentials => "Invalid username or password".to_owned(),
            Self::UserAlreadyExists => "Username or email already exists".to_owned(),
            Self::WeakPassword(msg) => capitalize(msg),
            Self::PasswordMismatch => "Passwords do not match".to_owned(),
            Self::Repository(_) | Self::PasswordHash => {
                "Something went wrong, please try again".to_owned()
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::UserAlreadyExists.user_message(),
            "Username or email already exists"
        );
        assert_eq!(
            AuthError::WeakPassword("password must be at least 8 characters".to_owned())
                .user_message(),
            "Password must be at least 8 characters"
        );
        assert_eq!(
            AuthError::PasswordHash.user_message(),
            "Something went wrong, please try again"
        );
    }
}
