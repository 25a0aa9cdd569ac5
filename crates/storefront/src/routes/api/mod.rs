//! JSON endpoints called by page scripts.
//!
//! Success bodies carry `"success": true`; failures go through
//! [`crate::error::ApiError`] as `{"success": false, "message": ...}`.

pub mod account;
pub mod checkout;
