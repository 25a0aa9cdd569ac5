//! Business logic services for the storefront.
//!
//! - `auth` - Registration, login, profile and password changes
//! - `catalog` - Cached room and shop listings
//! - `checkout` - Cart pricing and order placement
//! - `email` - Order confirmation emails

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod email;

pub use auth::{AuthError, AuthService};
pub use catalog::CatalogCache;
pub use checkout::{CheckoutError, CheckoutService};
