//! Session-stored shopping cart.
//!
//! Prices are never stored in the cart; they are looked up when the cart is
//! rendered and again when the order is placed.

use serde::{Deserialize, Serialize};

/// Upper bound on a single line's quantity.
pub const MAX_LINE_QUANTITY: i32 = 99;

/// One SKU/color/size combination in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub sku: String,
    pub quantity: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl CartLine {
    /// `sku` is compared trimmed, the way [`Cart::add`] stores it.
    fn matches(&self, sku: &str, color: Option<&str>, size: Option<&str>) -> bool {
        self.sku == sku.trim() && self.color.as_deref() == color && self.size.as_deref() == size
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Add `quantity` of a line, merging with an identical line if present.
    ///
    /// Non-positive quantities are ignored. Quantities are capped at
    /// [`MAX_LINE_QUANTITY`].
    pub fn add(&mut self, sku: &str, quantity: i32, color: Option<&str>, size: Option<&str>) {
        if quantity <= 0 || sku.trim().is_empty() {
            return;
        }
        let sku = sku.trim();
        if let Some(line) = self.lines.iter_mut().find(|l| l.matches(sku, color, size)) {
            line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
        } else {
            self.lines.push(CartLine {
                sku: sku.to_owned(),
                quantity: quantity.min(MAX_LINE_QUANTITY),
                color: color.map(str::to_owned),
                size: size.map(str::to_owned),
            });
        }
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// Returns `false` if no such line exists.
    pub fn set_quantity(
        &mut self,
        sku: &str,
        color: Option<&str>,
        size: Option<&str>,
        quantity: i32,
    ) -> bool {
        if quantity <= 0 {
            return self.remove(sku, color, size);
        }
        match self.lines.iter_mut().find(|l| l.matches(sku, color, size)) {
            Some(line) => {
                line.quantity = quantity.min(MAX_LINE_QUANTITY);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, sku: &str, color: Option<&str>, size: Option<&str>) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(sku, color, size));
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_identical_lines() {
        let mut cart = Cart::default();
        cart.add("WF-TS-001", 1, Some("Red"), Some("L"));
        cart.add("WF-TS-001", 2, Some("Red"), Some("L"));
        cart.add("WF-TS-001", 1, Some("Blue"), Some("L"));
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_add_ignores_nonpositive_and_blank() {
        let mut cart = Cart::default();
        cart.add("WF-TS-001", 0, None, None);
        cart.add("WF-TS-001", -3, None, None);
        cart.add("  ", 1, None, None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_is_capped() {
        let mut cart = Cart::default();
        cart.add("WF-TU-001", 90, None, None);
        cart.add("WF-TU-001", 90, None, None);
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        cart.add("WF-AR-001", 2, None, None);
        assert!(cart.set_quantity("WF-AR-001", None, None, 5));
        assert_eq!(cart.item_count(), 5);
        assert!(cart.set_quantity("WF-AR-001", None, None, 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity("WF-AR-001", None, None, 1));
    }

    #[test]
    fn test_padded_sku_finds_its_line() {
        let mut cart = Cart::default();
        cart.add(" WF-TS-003 ", 1, Some("Green"), None);
        assert_eq!(cart.lines[0].sku, "WF-TS-003");
        assert!(cart.set_quantity("WF-TS-003  ", Some("Green"), None, 4));
        assert_eq!(cart.item_count(), 4);
        assert!(cart.remove("  WF-TS-003", Some("Green"), None));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::default();
        cart.add("A", 1, None, None);
        cart.add("B", 1, None, None);
        assert!(cart.remove("A", None, None));
        assert!(!cart.remove("A", None, None));
        cart.clear();
        assert_eq!(cart.item_count(), 0);
    }
}
