//! Domain models for the back office.
//!
//! Repositories in [`crate::db`] own the row structs and build these.

pub mod catalog;
pub mod customer;
pub mod marketing;
pub mod order;
pub mod report;
pub mod room;
pub mod session;

pub use catalog::{
    CategorySummary, InventoryItem, InventoryQuery, ItemInput, ItemInputError, SkuRule,
};
pub use customer::{Address, Customer};
pub use marketing::{MarketingItem, MarketingSuggestion};
pub use order::{
    AvailableItem, LineChange, OrderDetail, OrderFilter, OrderFilterQuery, OrderLine,
    OrderSummary, OrderUpdate, OrderUpdateError, OrderUpdateForm,
};
pub use report::{Breakdown, DashboardStats, DateRange, DateRangeQuery, Report, TopItem};
pub use room::{Room, RoomAssignment, RoomInput};
pub use session::{CurrentAdmin, keys as session_keys};
