//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};

use whimsical_frog_core::{Email, UserId, Username};

/// Session-stored admin identity.
///
/// Admins are `shop.users` rows with the `admin` role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub name: String,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
