//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use whimsical_frog_core::{Email, UserId, UserRole, Username};

/// Postal address kept on the user profile and copied onto orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl Address {
    /// Whether any line of the address is filled in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state,
            &self.zip_code,
        ]
        .iter()
        .all(|part| part.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
}

/// Fields a customer can change on their own account.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
}

/// Trim a form value, mapping blank input to `None`.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Austin ".to_owned())).as_deref(), Some("Austin"));
        assert_eq!(non_blank(Some("   ".to_owned())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_address_is_empty() {
        assert!(Address::default().is_empty());
        let address = Address {
            city: Some("Dallas".to_owned()),
            ..Address::default()
        };
        assert!(!address.is_empty());
    }
}
