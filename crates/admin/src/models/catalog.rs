//! Inventory items, categories and SKU rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use whimsical_frog_core::{CategoryId, SkuRuleId};

/// An item as the back office sees it, cost price included.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub category: Option<String>,
    pub stock_level: i32,
    pub reorder_point: i32,
    pub cost_price: Decimal,
    pub retail_price: Decimal,
    pub description: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_archived: bool,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_level <= self.reorder_point
    }

    #[must_use]
    pub fn margin(&self) -> Decimal {
        self.retail_price - self.cost_price
    }
}

/// Item form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    /// Blank means "generate from the category code".
    #[serde(default)]
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<i32>,
    #[serde(default)]
    pub stock_level: i32,
    #[serde(default)]
    pub reorder_point: i32,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub retail_price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    /// HTML checkbox: present when ticked.
    #[serde(default)]
    pub is_active: Option<String>,
}

/// Invalid item form input.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ItemInputError {
    #[error("Item name is required")]
    MissingName,
    #[error("Stock levels cannot be negative")]
    NegativeStock,
    #[error("Prices cannot be negative")]
    NegativePrice,
    #[error("SKU may only contain letters, digits and hyphens")]
    InvalidSku,
}

impl ItemInput {
    /// Check and tidy the input.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(mut self) -> Result<Self, ItemInputError> {
        self.name = self.name.trim().to_owned();
        self.sku = self.sku.trim().to_ascii_uppercase();
        self.description = self.description.trim().to_owned();
        self.image_url = self.image_url.trim().to_owned();

        if self.name.is_empty() {
            return Err(ItemInputError::MissingName);
        }
        if self.stock_level < 0 || self.reorder_point < 0 {
            return Err(ItemInputError::NegativeStock);
        }
        if self.cost_price.is_sign_negative() || self.retail_price.is_sign_negative() {
            return Err(ItemInputError::NegativePrice);
        }
        if !self
            .sku
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ItemInputError::InvalidSku);
        }
        Ok(self)
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        Some(self.image_url.as_str()).filter(|s| !s.is_empty())
    }
}

/// A category with its SKU code and how many active items use it.
/// `GET /inventory` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub archived: Option<String>,
}

impl InventoryQuery {
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Selected category id. Blank or non-numeric values mean all.
    #[must_use]
    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    #[must_use]
    pub fn include_archived(&self) -> bool {
        matches!(self.archived.as_deref(), Some("1" | "on" | "true"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
    pub sku_code: String,
    pub item_count: i64,
}

/// A stored category to SKU prefix override.
#[derive(Debug, Clone, Serialize)]
pub struct SkuRule {
    pub id: SkuRuleId,
    pub category_name: String,
    pub sku_code: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ItemInput {
        ItemInput {
            name: " Frog Mug ".to_owned(),
            sku: " wf-tu-001 ".to_owned(),
            stock_level: 3,
            reorder_point: 1,
            retail_price: Decimal::new(1500, 2),
            ..ItemInput::default()
        }
    }

    #[test]
    fn test_validate_tidies_input() {
        let item = input().validate().unwrap();
        assert_eq!(item.name, "Frog Mug");
        assert_eq!(item.sku, "WF-TU-001");
        assert!(!item.active());
        assert_eq!(item.image(), None);
    }

    #[test]
    fn test_inventory_query() {
        let query = InventoryQuery {
            search: Some("  ".to_owned()),
            category: Some("4".to_owned()),
            archived: Some("on".to_owned()),
        };
        assert_eq!(query.search(), None);
        assert_eq!(query.category_id(), Some(CategoryId::new(4)));
        assert!(query.include_archived());
        assert_eq!(InventoryQuery::default().category_id(), None);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let blank = ItemInput {
            name: "  ".to_owned(),
            ..input()
        };
        assert_eq!(blank.validate().unwrap_err(), ItemInputError::MissingName);

        let negative = ItemInput {
            stock_level: -1,
            ..input()
        };
        assert_eq!(negative.validate().unwrap_err(), ItemInputError::NegativeStock);

        let price = ItemInput {
            cost_price: Decimal::new(-1, 0),
            ..input()
        };
        assert_eq!(price.validate().unwrap_err(), ItemInputError::NegativePrice);

        let sku = ItemInput {
            sku: "WF TU 1".to_owned(),
            ..input()
        };
        assert_eq!(sku.validate().unwrap_err(), ItemInputError::InvalidSku);
    }
}
