//! Core types for WhimsicalFrog.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod role;
pub mod status;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use role::{UserRole, UserRoleError};
pub use status::*;
pub use username::{Username, UsernameError};
