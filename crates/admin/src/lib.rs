//! WhimsicalFrog back-office library.
//!
//! Inventory, catalog, orders, customers, marketing copy, reports, secrets
//! and pricing settings for the admin panel on port 3001. Exposed as a
//! library so the CLI can run the `admin` migrations and integration tests
//! can build the router.
//!
//! # Security
//!
//! Every page and API route except login and health checks requires a
//! session whose user currently holds the `admin` role.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
