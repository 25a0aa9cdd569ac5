//! Business logic that spans repositories or talks to the outside world.

pub mod auth;
pub mod email;
pub mod pricing;
pub mod secrets;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService, SmtpLogin};
pub use pricing::PricingCache;
pub use secrets::{SecretCipher, SecretsError, SecretsService};
