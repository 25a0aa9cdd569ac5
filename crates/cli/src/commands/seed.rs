//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: T-Shirts
//!   - name: Mugs
//!     sku_code: MUG
//! rooms:
//!   - room_number: 2
//!     room_name: T-Shirts
//!     categories: [T-Shirts]      # first entry is the primary category
//! items:
//!   - name: Frog Tee
//!     category: T-Shirts
//!     retail_price: "24.99"
//!     stock_level: 12
//! ```
//!
//! Seeding is idempotent: existing categories are reused, rooms and SKU rules
//! are upserted, and items whose SKU already exists are updated. Items without
//! a SKU get the next generated one for their category.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use whimsical_frog_admin::db::{
    CategoryRepository, InventoryRepository, RepositoryError, RoomRepository, SkuRuleRepository,
};
use whimsical_frog_admin::models::{ItemInput, ItemInputError, RoomInput};
use whimsical_frog_core::CategoryId;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not read {0}: {1}")]
    Read(String, std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid catalog:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Item {0}: {1}")]
    Item(String, ItemInputError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub rooms: Vec<RoomSeed>,
    #[serde(default)]
    pub items: Vec<ItemSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    /// Overrides the derived SKU code.
    #[serde(default)]
    pub sku_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomSeed {
    pub room_number: i32,
    pub room_name: String,
    #[serde(default)]
    pub door_label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSeed {
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub stock_level: i32,
    #[serde(default = "default_reorder_point")]
    pub reorder_point: i32,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub retail_price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_reorder_point() -> i32 {
    5
}

const fn default_active() -> bool {
    true
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Check cross references before touching the database.
///
/// Returns one message per problem.
#[must_use]
pub fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashMap::new();
    for category in &seed.categories {
        if category.name.trim().is_empty() {
            errors.push("category with empty name".to_owned());
        } else if names.insert(key(&category.name), ()).is_some() {
            errors.push(format!("duplicate category {}", category.name));
        }
    }

    for room in &seed.rooms {
        if !(0..=99).contains(&room.room_number) {
            errors.push(format!("room {}: number must be 0-99", room.room_number));
        }
        for category in &room.categories {
            if !names.contains_key(&key(category)) {
                errors.push(format!("room {}: unknown category {category}", room.room_number));
            }
        }
    }

    for item in &seed.items {
        if !names.contains_key(&key(&item.category)) {
            errors.push(format!("item {}: unknown category {}", item.name, item.category));
        }
    }
    errors
}

impl ItemSeed {
    fn input(&self, category_id: CategoryId) -> ItemInput {
        ItemInput {
            sku: self.sku.clone().unwrap_or_default(),
            name: self.name.clone(),
            category_id: Some(category_id.as_i32()),
            stock_level: self.stock_level,
            reorder_point: self.reorder_point,
            cost_price: self.cost_price,
            retail_price: self.retail_price,
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            is_active: self.is_active.then(|| "on".to_owned()),
        }
    }
}

/// Load, validate and apply a catalog file.
///
/// # Errors
///
/// Returns `SeedError::Invalid` listing every problem in the file, or the
/// first database error.
pub async fn catalog(file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading catalog");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SeedError::Read(file_path.to_owned(), e))?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        return Err(SeedError::Invalid(errors));
    }
    info!(
        categories = seed.categories.len(),
        rooms = seed.rooms.len(),
        items = seed.items.len(),
        "Parsed catalog"
    );

    let pool = connect("ADMIN_DATABASE_URL").await?;
    let ids = seed_categories(&pool, &seed.categories).await?;
    seed_rooms(&pool, &seed.rooms, &ids).await?;
    seed_items(&pool, &seed.items, &ids).await?;

    info!("Catalog seeded");
    Ok(())
}

async fn seed_categories(
    pool: &PgPool,
    categories: &[CategorySeed],
) -> Result<HashMap<String, CategoryId>, SeedError> {
    let repo = CategoryRepository::new(pool);
    let mut ids: HashMap<String, CategoryId> = repo
        .list()
        .await?
        .into_iter()
        .map(|c| (key(&c.name), c.id))
        .collect();

    for category in categories {
        if !ids.contains_key(&key(&category.name)) {
            let id = repo.add(&category.name).await?;
            info!(name = %category.name, %id, "Category created");
            ids.insert(key(&category.name), id);
        }
        if let Some(code) = &category.sku_code {
            SkuRuleRepository::new(pool)
                .upsert(category.name.trim(), code)
                .await?;
        }
    }
    Ok(ids)
}

async fn seed_rooms(
    pool: &PgPool,
    rooms: &[RoomSeed],
    ids: &HashMap<String, CategoryId>,
) -> Result<(), SeedError> {
    let repo = RoomRepository::new(pool);
    for room in rooms {
        let input = RoomInput {
            room_number: room.room_number,
            room_name: room.room_name.clone(),
            door_label: room.door_label.clone(),
            description: room.description.clone(),
            display_order: room.display_order,
            is_active: true,
        }
        .validate()
        .map_err(|e| SeedError::Invalid(vec![format!("room {}: {e}", room.room_number)]))?;
        repo.upsert(&input).await?;

        for (position, name) in room.categories.iter().enumerate() {
            if let Some(id) = ids.get(&key(name)) {
                let order = i32::try_from(position).unwrap_or(i32::MAX);
                repo.assign(room.room_number, *id, position == 0, order)
                    .await?;
            }
        }
        info!(room = room.room_number, "Room seeded");
    }
    Ok(())
}

async fn seed_items(
    pool: &PgPool,
    items: &[ItemSeed],
    ids: &HashMap<String, CategoryId>,
) -> Result<(), SeedError> {
    let inventory = InventoryRepository::new(pool);
    let categories = CategoryRepository::new(pool);

    for item in items {
        let Some(category_id) = ids.get(&key(&item.category)).copied() else {
            warn!(item = %item.name, "Skipping item with unknown category");
            continue;
        };
        let input = item
            .input(category_id)
            .validate()
            .map_err(|e| SeedError::Item(item.name.clone(), e))?;

        if !input.sku.is_empty() && inventory.get(&input.sku).await?.is_some() {
            inventory.update(&input.sku, &input).await?;
            info!(sku = %input.sku, "Item updated");
            continue;
        }

        let code = categories.sku_code_for(Some(category_id)).await?;
        let sku = inventory.create(&input, &code).await?;
        info!(%sku, name = %input.name, "Item created");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: T-Shirts
  - name: Mugs
    sku_code: MUG
rooms:
  - room_number: 2
    room_name: T-Shirts
    categories: [T-Shirts]
items:
  - name: Frog Tee
    category: t-shirts
    retail_price: "24.99"
    stock_level: 12
  - sku: WF-MUG-001
    name: Lily Mug
    category: Mugs
"#;

    #[test]
    fn test_parse_sample() {
        let seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.categories[1].sku_code.as_deref(), Some("MUG"));
        assert_eq!(seed.items[0].retail_price, Decimal::new(2499, 2));
        assert_eq!(seed.items[1].reorder_point, 5);
        assert!(seed.items[1].is_active);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r"
categories:
  - name: Mugs
  - name: mugs
rooms:
  - room_number: 120
    room_name: Attic
    categories: [Hats]
items:
  - name: Cap
    category: Hats
",
        )
        .unwrap();
        let errors = validate(&seed);
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("duplicate category")));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(serde_yaml::from_str::<CatalogSeed>("products: []").is_err());
    }

    #[test]
    fn test_item_input() {
        let seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        let input = seed.items[1].input(CategoryId::new(7));
        assert_eq!(input.sku, "WF-MUG-001");
        assert_eq!(input.category_id, Some(7));
        assert!(input.active());
    }
}
