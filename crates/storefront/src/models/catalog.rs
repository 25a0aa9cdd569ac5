//! Catalog types: categories, items and rooms.

use rust_decimal::Decimal;
use serde::Serialize;

use whimsical_frog_core::CategoryId;

/// Category shown for a room that has no primary assignment yet.
const DEFAULT_ROOM_CATEGORIES: &[(i32, &str)] = &[
    (2, "T-Shirts"),
    (3, "Tumblers"),
    (4, "Artwork"),
    (5, "Sublimation"),
    (6, "Window Wraps"),
];

/// Category name a room falls back to when nothing is assigned.
#[must_use]
pub fn default_room_category(room_number: i32) -> Option<&'static str> {
    DEFAULT_ROOM_CATEGORIES
        .iter()
        .find(|(n, _)| *n == room_number)
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

/// A sellable item as customers see it (no cost price).
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub sku: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub category: Option<String>,
    pub stock_level: i32,
    pub retail_price: Decimal,
    pub description: String,
    pub image_url: Option<String>,
}

impl Item {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_level > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub room_number: i32,
    pub room_name: String,
    pub door_label: String,
    pub description: String,
    pub display_order: i32,
}

/// Everything needed to render a room.
#[derive(Debug, Clone)]
pub struct RoomPage {
    pub room: Room,
    pub category: Option<Category>,
    pub items: Vec<Item>,
}

impl RoomPage {
    /// Page title: the room's own name, else `Shop {category}`.
    #[must_use]
    pub fn title(&self) -> String {
        let name = self.room.room_name.trim();
        if !name.is_empty() {
            return name.to_owned();
        }
        self.category.as_ref().map_or_else(
            || format!("Room {}", self.room.room_number),
            |c| format!("Shop {}", c.name),
        )
    }
}

/// Items grouped under their category for the `/shop` page.
#[derive(Debug, Clone)]
pub struct CategorySection {
    pub category: String,
    pub items: Vec<Item>,
}

/// Group items (already sorted by category order) into sections.
#[must_use]
pub fn group_by_category(items: Vec<Item>) -> Vec<CategorySection> {
    let mut sections: Vec<CategorySection> = Vec::new();
    for item in items {
        let name = item
            .category
            .clone()
            .unwrap_or_else(|| "Other".to_owned());
        match sections.last_mut() {
            Some(section) if section.category == name => section.items.push(item),
            _ => sections.push(CategorySection {
                category: name,
                items: vec![item],
            }),
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, category: Option<&str>) -> Item {
        Item {
            sku: sku.to_owned(),
            name: sku.to_owned(),
            category_id: None,
            category: category.map(str::to_owned),
            stock_level: 1,
            retail_price: Decimal::ONE,
            description: String::new(),
            image_url: None,
        }
    }

    fn room(name: &str) -> Room {
        Room {
            room_number: 3,
            room_name: name.to_owned(),
            door_label: String::new(),
            description: String::new(),
            display_order: 0,
        }
    }

    #[test]
    fn test_default_room_category() {
        assert_eq!(default_room_category(2), Some("T-Shirts"));
        assert_eq!(default_room_category(6), Some("Window Wraps"));
        assert_eq!(default_room_category(7), None);
    }

    #[test]
    fn test_room_title_prefers_room_name() {
        let page = RoomPage {
            room: room("Tumbler Lounge"),
            category: None,
            items: Vec::new(),
        };
        assert_eq!(page.title(), "Tumbler Lounge");
    }

    #[test]
    fn test_room_title_falls_back_to_category() {
        let page = RoomPage {
            room: room("  "),
            category: Some(Category {
                id: CategoryId::new(1),
                name: "Tumblers".to_owned(),
                slug: "tumblers".to_owned(),
                description: None,
                sort_order: 0,
            }),
            items: Vec::new(),
        };
        assert_eq!(page.title(), "Shop Tumblers");
    }

    #[test]
    fn test_group_by_category_keeps_order() {
        let sections = group_by_category(vec![
            item("A1", Some("Artwork")),
            item("A2", Some("Artwork")),
            item("T1", Some("Tumblers")),
            item("X1", None),
        ]);
        let names: Vec<&str> = sections.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["Artwork", "Tumblers", "Other"]);
        assert_eq!(sections.first().map(|s| s.items.len()), Some(2));
    }
}
