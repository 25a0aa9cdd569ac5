//! Domain models for the storefront.
//!
//! These are validated types built from database rows; the repositories in
//! [`crate::db`] own the row structs and the conversions.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine};
pub use catalog::{Category, CategorySection, Item, Room, RoomPage};
pub use order::{NewOrder, NewOrderLine, Order, OrderLine};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Address, NewUser, ProfileUpdate, User};
