//! Categories and SKU prefix rules.
//!
//! Items reference categories by id, so renames never touch `shop.items`.
//! Deleting a category that still has items requires a reassignment target.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use whimsical_frog_core::sku::{category_code, is_valid_code, slugify, unique_slug};
use whimsical_frog_core::{CategoryId, SkuRuleId};

use super::RepositoryError;
use crate::models::{CategorySummary, SkuRule};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    sort_order: i32,
    sku_code: Option<String>,
    item_count: i64,
}

impl From<CategoryRow> for CategorySummary {
    fn from(row: CategoryRow) -> Self {
        let sku_code = row.sku_code.unwrap_or_else(|| category_code(&row.name));
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            sort_order: row.sort_order,
            sku_code,
            item_count: row.item_count,
        }
    }
}

/// Outcome of deleting a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted {
    /// Items moved to the reassignment target.
    pub reassigned: u64,
}

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by sort order then name, with their SKU code and the
    /// number of active, unarchived items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"
            SELECT c.id, c.name, c.slug, c.sort_order, r.sku_code,
                   (SELECT count(*) FROM shop.items i
                    WHERE i.category_id = c.id AND i.is_active AND NOT i.is_archived) AS item_count
            FROM shop.categories c
            LEFT JOIN admin.sku_rules r ON lower(r.category_name) = lower(c.name)
            ORDER BY c.sort_order, c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CategorySummary::from).collect())
    }

    /// SKU code for a category: its rule if one exists, otherwise derived
    /// from the name. Items without a category use the fallback code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn sku_code_for(&self, id: Option<CategoryId>) -> Result<String, RepositoryError> {
        let Some(id) = id else {
            return Ok(category_code(""));
        };
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            r"
            SELECT c.name, r.sku_code
            FROM shop.categories c
            LEFT JOIN admin.sku_rules r ON lower(r.category_name) = lower(c.name)
            WHERE c.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let (name, rule) = row.ok_or(RepositoryError::NotFound)?;
        Ok(rule.unwrap_or_else(|| category_code(&name)))
    }

    /// Add a category at the end of the sort order with a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn add(&self, name: &str) -> Result<CategoryId, RepositoryError> {
        let name = name.trim();
        let taken: HashSet<String> = sqlx::query_scalar("SELECT slug FROM shop.categories")
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .collect();

        let slug = unique_slug(&slugify(name), |candidate| taken.contains(candidate))
            .ok_or_else(|| RepositoryError::Conflict("Could not allocate a slug".to_owned()))?;

        sqlx::query_scalar(
            r"
            INSERT INTO shop.categories (name, slug, sort_order)
            VALUES ($1, $2, (SELECT COALESCE(max(sort_order), 0) + 1 FROM shop.categories))
            RETURNING id
            ",
        )
        .bind(name)
        .bind(&slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "Category already exists"))
    }

    /// Rename a category. A SKU rule keyed on the old name follows it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `old_name` does not exist and
    /// `RepositoryError::Conflict` if `new_name` is taken.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE shop.categories SET name = $2, updated_at = now() WHERE lower(name) = lower($1)",
        )
        .bind(old_name.trim())
        .bind(new_name.trim())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "Category already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r"
            UPDATE admin.sku_rules SET category_name = $2, updated_at = now()
            WHERE lower(category_name) = lower($1)
            ",
        )
        .bind(old_name.trim())
        .bind(new_name.trim())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "A SKU rule already exists for that name"))?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a category, first moving its items to `reassign_to` if any
    /// item still uses it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if either category does not exist
    /// and `RepositoryError::Conflict` if items remain and no target is given.
    pub async fn delete(
        &self,
        name: &str,
        reassign_to: Option<&str>,
    ) -> Result<Deleted, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: CategoryId =
            sqlx::query_scalar("SELECT id FROM shop.categories WHERE lower(name) = lower($1)")
                .bind(name.trim())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let in_use: i64 =
            sqlx::query_scalar("SELECT count(*) FROM shop.items WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        let mut reassigned = 0;
        if in_use > 0 {
            let target_name = reassign_to
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    RepositoryError::Conflict("Category in use; provide reassign_to".to_owned())
                })?;
            let target: CategoryId = sqlx::query_scalar(
                "SELECT id FROM shop.categories WHERE lower(name) = lower($1) AND id <> $2",
            )
            .bind(target_name)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

            reassigned = sqlx::query(
                "UPDATE shop.items SET category_id = $2, updated_at = now() WHERE category_id = $1",
            )
            .bind(id)
            .bind(target)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        sqlx::query("DELETE FROM shop.categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Deleted { reassigned })
    }

    /// Set `sort_order` to each name's position. Unknown names are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an update fails.
    pub async fn reorder(&self, names: &[String]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for (position, name) in dedup_names(names).iter().enumerate() {
            updated += sqlx::query(
                "UPDATE shop.categories SET sort_order = $2, updated_at = now() WHERE lower(name) = lower($1)",
            )
            .bind(name)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }
}

/// Trim, drop blanks and keep the first of any case-insensitive duplicates.
fn dedup_names(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
        .collect()
}

#[derive(sqlx::FromRow)]
struct SkuRuleRow {
    id: SkuRuleId,
    category_name: String,
    sku_code: String,
    updated_at: DateTime<Utc>,
}

impl From<SkuRuleRow> for SkuRule {
    fn from(row: SkuRuleRow) -> Self {
        Self {
            id: row.id,
            category_name: row.category_name,
            sku_code: row.sku_code,
            updated_at: row.updated_at,
        }
    }
}

pub struct SkuRuleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SkuRuleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<SkuRule>, RepositoryError> {
        let rows: Vec<SkuRuleRow> = sqlx::query_as(
            "SELECT id, category_name, sku_code, updated_at FROM admin.sku_rules ORDER BY category_name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(SkuRule::from).collect())
    }

    /// Insert or replace the rule for `category_name`. The code is uppercased.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the code is not 1-4 letters.
    pub async fn upsert(&self, category_name: &str, sku_code: &str) -> Result<SkuRule, RepositoryError> {
        let code = sku_code.trim().to_ascii_uppercase();
        if !is_valid_code(&code) {
            return Err(RepositoryError::Invalid(
                "SKU code must be 1-4 letters".to_owned(),
            ));
        }

        let row: SkuRuleRow = sqlx::query_as(
            r"
            INSERT INTO admin.sku_rules (category_name, sku_code)
            VALUES ($1, $2)
            ON CONFLICT ((lower(category_name)))
            DO UPDATE SET sku_code = EXCLUDED.sku_code, updated_at = now()
            RETURNING id, category_name, sku_code, updated_at
            ",
        )
        .bind(category_name.trim())
        .bind(&code)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such rule exists.
    pub async fn delete(&self, id: SkuRuleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM admin.sku_rules WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_names_case_insensitive() {
        let names = vec![
            "Mugs".to_owned(),
            " mugs ".to_owned(),
            String::new(),
            "T-Shirts".to_owned(),
            "MUGS".to_owned(),
        ];
        assert_eq!(dedup_names(&names), vec!["Mugs", "T-Shirts"]);
    }

    #[test]
    fn test_summary_falls_back_to_derived_code() {
        let summary = CategorySummary::from(CategoryRow {
            id: CategoryId::new(1),
            name: "Mugs".to_owned(),
            slug: "mugs".to_owned(),
            sort_order: 0,
            sku_code: None,
            item_count: 2,
        });
        assert_eq!(summary.sku_code, "MU");
    }
}
