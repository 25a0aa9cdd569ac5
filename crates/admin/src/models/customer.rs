//! Customer accounts as listed in the back office.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use whimsical_frog_core::{UserId, UserRole};

/// Postal address stored on the user row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

impl Address {
    /// Trim every line and turn blanks into `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        }
        Self {
            address_line1: clean(self.address_line1),
            address_line2: clean(self.address_line2),
            city: clean(self.city),
            state: clean(self.state),
            zip_code: clean(self.zip_code),
        }
    }

    /// Single-line rendering for tables and receipts.
    #[must_use]
    pub fn one_line(&self) -> String {
        let city_line = [self.city.as_deref(), self.state.as_deref(), self.zip_code.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        [
            self.address_line1.as_deref(),
            self.address_line2.as_deref(),
            Some(city_line.as_str()).filter(|s| !s.is_empty()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
    pub order_count: i64,
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    #[must_use]
    pub fn full_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.trim().is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_blanks() {
        let address = Address {
            address_line1: Some(" 1 Pond Rd ".to_owned()),
            city: Some(" ".to_owned()),
            ..Address::default()
        }
        .normalized();
        assert_eq!(address.address_line1.as_deref(), Some("1 Pond Rd"));
        assert_eq!(address.city, None);
    }

    #[test]
    fn test_one_line() {
        let address = Address {
            address_line1: Some("1 Pond Rd".to_owned()),
            city: Some("Dallas".to_owned()),
            state: Some("TX".to_owned()),
            zip_code: Some("75001".to_owned()),
            ..Address::default()
        };
        assert_eq!(address.one_line(), "1 Pond Rd, Dallas TX 75001");
        assert_eq!(Address::default().one_line(), "");
    }
}
