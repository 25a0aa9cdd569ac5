//! Marketing suggestion storage.
//!
//! Column names are only ever taken from [`MarketingField::column`], which
//! resolves against a fixed table, so formatting them into SQL is safe.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use serde_json::{Map, Value};

use whimsical_frog_core::marketing::{
    FieldKind, MarketingError, MarketingField, add_to_list, normalize_list, remove_from_list,
};

use super::RepositoryError;
use crate::models::{MarketingItem, MarketingSuggestion};

/// Validated changes for a bulk save.
#[derive(Debug, Clone, Default)]
pub struct BulkUpdate {
    pub text: Vec<(MarketingField, Option<String>)>,
    pub lists: Vec<(MarketingField, Vec<String>)>,
}

impl BulkUpdate {
    /// Validate a `{"field": value}` object. Text fields take strings or
    /// numbers; list fields take an array or a single string.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown field or invalid text value.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, MarketingError> {
        let mut update = Self::default();
        for (name, value) in fields {
            let field = MarketingField::parse(name)?;
            match field.kind() {
                FieldKind::Text => {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        _ => String::new(),
                    };
                    update.text.push((field, field.normalize_text(&text)?));
                }
                FieldKind::List => update.lists.push((field, normalize_list(value))),
            }
        }
        Ok(update)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.lists.is_empty()
    }
}

pub struct MarketingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MarketingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Unarchived items with whether marketing data has been saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self) -> Result<Vec<MarketingItem>, RepositoryError> {
        Ok(sqlx::query_as(
            r"
            SELECT i.sku, i.name, c.name AS category, (m.sku IS NOT NULL) AS saved
            FROM shop.items i
            LEFT JOIN shop.categories c ON c.id = i.category_id
            LEFT JOIN admin.marketing_suggestions m ON m.sku = i.sku
            WHERE NOT i.is_archived
            ORDER BY i.name, i.sku
            ",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// Marketing data for an item; empty fields when nothing is saved yet.
    /// `None` if the item does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, sku: &str) -> Result<Option<MarketingSuggestion>, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.items WHERE sku = $1)")
            .bind(sku)
            .fetch_one(self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let row: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT to_jsonb(m) FROM admin.marketing_suggestions m WHERE m.sku = $1",
        )
        .bind(sku)
        .fetch_optional(self.pool)
        .await?;

        Ok(Some(MarketingSuggestion::from_row(
            sku,
            row.as_ref().and_then(serde_json::Value::as_object),
        )))
    }

    /// Set one text column.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn update_text(
        &self,
        sku: &str,
        field: MarketingField,
        value: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(&mut tx, sku).await?;
        set_text(&mut tx, sku, field, value).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Apply several text and list changes at once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn bulk_update(&self, sku: &str, update: &BulkUpdate) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(&mut tx, sku).await?;
        for (field, value) in &update.text {
            set_text(&mut tx, sku, *field, value.as_deref()).await?;
        }
        for (field, items) in &update.lists {
            set_list(&mut tx, sku, *field, items).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Append to a list column unless already present. Returns the new list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn add_list_item(
        &self,
        sku: &str,
        field: MarketingField,
        item: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        ensure_row(&mut tx, sku).await?;
        let mut list = lock_list(&mut tx, sku, field)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if add_to_list(&mut list, item) {
            set_list(&mut tx, sku, field, &list).await?;
        }
        tx.commit().await?;
        Ok(list)
    }

    /// Remove from a list column. Returns the new list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no marketing data is saved.
    pub async fn remove_list_item(
        &self,
        sku: &str,
        field: MarketingField,
        item: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut list = lock_list(&mut tx, sku, field)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if remove_from_list(&mut list, item) {
            set_list(&mut tx, sku, field, &list).await?;
        }
        tx.commit().await?;
        Ok(list)
    }
}

async fn ensure_row(tx: &mut Transaction<'_, Postgres>, sku: &str) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO admin.marketing_suggestions (sku) VALUES ($1) ON CONFLICT (sku) DO NOTHING")
        .bind(sku)
        .execute(&mut **tx)
        .await
        .map_err(|e| match RepositoryError::from_foreign_key(e, "Item not found") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;
    Ok(())
}

async fn set_text(
    tx: &mut Transaction<'_, Postgres>,
    sku: &str,
    field: MarketingField,
    value: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "UPDATE admin.marketing_suggestions SET {} = $2, updated_at = now() WHERE sku = $1",
        field.column()
    ))
    .bind(sku)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn set_list(
    tx: &mut Transaction<'_, Postgres>,
    sku: &str,
    field: MarketingField,
    items: &[String],
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "UPDATE admin.marketing_suggestions SET {} = $2, updated_at = now() WHERE sku = $1",
        field.column()
    ))
    .bind(sku)
    .bind(Json(items))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Read a list column, locking the row. `None` when no row exists.
async fn lock_list(
    tx: &mut Transaction<'_, Postgres>,
    sku: &str,
    field: MarketingField,
) -> Result<Option<Vec<String>>, RepositoryError> {
    let value: Option<serde_json::Value> = sqlx::query_scalar(&format!(
        "SELECT {} FROM admin.marketing_suggestions WHERE sku = $1 FOR UPDATE",
        field.column()
    ))
    .bind(sku)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(value.as_ref().map(normalize_list))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_bulk_update_splits_text_and_lists() {
        let update = BulkUpdate::from_fields(&fields(json!({
            "suggested_title": " Froggy Mug ",
            "confidence_score": 0.8,
            "keywords": ["mug", " ", "frog"],
            "selling_points": "Dishwasher safe",
        })))
        .unwrap();

        assert_eq!(update.text.len(), 2);
        assert_eq!(update.lists.len(), 2);
        let keywords = update
            .lists
            .iter()
            .find(|(f, _)| f.column() == "keywords")
            .unwrap();
        assert_eq!(keywords.1, vec!["mug", "frog"]);
        let title = update
            .text
            .iter()
            .find(|(f, _)| f.column() == "suggested_title")
            .unwrap();
        assert_eq!(title.1.as_deref(), Some("Froggy Mug"));
    }

    #[test]
    fn test_bulk_update_rejects_unknown_field() {
        let err = BulkUpdate::from_fields(&fields(json!({ "sku": "WF-MU-001" }))).unwrap_err();
        assert_eq!(err, MarketingError::InvalidField);
    }

    #[test]
    fn test_bulk_update_rejects_bad_confidence() {
        let err =
            BulkUpdate::from_fields(&fields(json!({ "confidence_score": "1.5" }))).unwrap_err();
        assert_eq!(err, MarketingError::InvalidConfidence);
    }

    #[test]
    fn test_empty_bulk_update() {
        assert!(BulkUpdate::from_fields(&Map::new()).unwrap().is_empty());
    }
}
