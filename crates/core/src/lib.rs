//! WhimsicalFrog Core - Shared domain types and business rules.
//!
//! This crate provides the types used across all WhimsicalFrog components:
//! - `storefront` - Public shop, cart, checkout and customer accounts
//! - `admin` - Back office (inventory, orders, marketing, reports, secrets)
//! - `cli` - Command-line tools for migrations, users and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything here is deterministic and unit-tested.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, usernames, roles and statuses
//! - [`sku`] - Category codes, SKU formatting and price-lookup fallbacks
//! - [`order_number`] - Order and order-item identifier generation
//! - [`pricing`] - Shipping and tax quotes
//! - [`marketing`] - Editable marketing suggestion fields

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod marketing;
pub mod order_number;
pub mod pricing;
pub mod sku;
pub mod types;

pub use types::*;
