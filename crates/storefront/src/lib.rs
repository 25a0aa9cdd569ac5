//! WhimsicalFrog storefront library.
//!
//! Routes, middleware and services for the public shop, exposed as a library
//! so the CLI can reuse the migrations and account tooling.

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
