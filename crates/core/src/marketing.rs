//! Marketing suggestion fields.
//!
//! A marketing suggestion holds free-text copy (title, tone, audience...) and
//! a set of string lists (keywords, selling points...) per item. Field names
//! arrive from the browser, so they are resolved against a fixed table here
//! and only the resulting `&'static str` column name ever reaches SQL.

use rust_decimal::Decimal;
use serde::Serialize;

/// Whether a field holds one string or a list of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    List,
}

/// Scalar text columns.
pub const TEXT_FIELDS: [&str; 13] = [
    "suggested_title",
    "suggested_description",
    "target_audience",
    "psychographic_profile",
    "demographic_targeting",
    "market_positioning",
    "brand_voice",
    "content_tone",
    "seasonal_relevance",
    "pricing_psychology",
    "search_intent",
    "confidence_score",
    "recommendation_reasoning",
];

/// JSON list columns.
pub const LIST_FIELDS: [&str; 18] = [
    "keywords",
    "emotional_triggers",
    "selling_points",
    "competitive_advantages",
    "unique_selling_points",
    "value_propositions",
    "marketing_channels",
    "urgency_factors",
    "social_proof_elements",
    "call_to_action_suggestions",
    "conversion_triggers",
    "objection_handlers",
    "seo_keywords",
    "content_themes",
    "customer_benefits",
    "pain_points_addressed",
    "lifestyle_alignment",
    "market_trends",
];

/// Errors raised when validating marketing input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketingError {
    #[error("Invalid field name.")]
    InvalidField,
    #[error("Field {0} holds a list; use add_list_item or remove_list_item.")]
    NotAText(&'static str),
    #[error("Field {0} holds text, not a list.")]
    NotAList(&'static str),
    #[error("Confidence score must be a number between 0 and 1.")]
    InvalidConfidence,
}

/// A validated marketing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketingField {
    column: &'static str,
    kind: FieldKind,
}

impl MarketingField {
    /// Resolve a field name supplied by a client.
    ///
    /// # Errors
    ///
    /// Returns [`MarketingError::InvalidField`] for unknown names.
    pub fn parse(name: &str) -> Result<Self, MarketingError> {
        let name = name.trim();
        if let Some(column) = TEXT_FIELDS.iter().find(|f| **f == name) {
            return Ok(Self {
                column: *column,
                kind: FieldKind::Text,
            });
        }
        LIST_FIELDS
            .iter()
            .find(|f| **f == name)
            .map(|column| Self {
                column: *column,
                kind: FieldKind::List,
            })
            .ok_or(MarketingError::InvalidField)
    }

    /// Resolve a name that must be a text field.
    ///
    /// # Errors
    ///
    /// Fails for unknown names and list fields.
    pub fn parse_text(name: &str) -> Result<Self, MarketingError> {
        let field = Self::parse(name)?;
        match field.kind {
            FieldKind::Text => Ok(field),
            FieldKind::List => Err(MarketingError::NotAText(field.column)),
        }
    }

    /// Resolve a name that must be a list field.
    ///
    /// # Errors
    ///
    /// Fails for unknown names and text fields.
    pub fn parse_list(name: &str) -> Result<Self, MarketingError> {
        let field = Self::parse(name)?;
        match field.kind {
            FieldKind::List => Ok(field),
            FieldKind::Text => Err(MarketingError::NotAList(field.column)),
        }
    }

    #[must_use]
    pub const fn column(self) -> &'static str {
        self.column
    }

    #[must_use]
    pub const fn kind(self) -> FieldKind {
        self.kind
    }

    /// Normalize a text value before storing it.
    ///
    /// # Errors
    ///
    /// `confidence_score` must be empty or a decimal in `0..=1`.
    pub fn normalize_text(self, value: &str) -> Result<Option<String>, MarketingError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        if self.column == "confidence_score" {
            let score: Decimal = value
                .parse()
                .map_err(|_| MarketingError::InvalidConfidence)?;
            if score < Decimal::ZERO || score > Decimal::ONE {
                return Err(MarketingError::InvalidConfidence);
            }
        }
        Ok(Some(value.to_owned()))
    }
}

/// Coerce a JSON value into a list of non-empty strings.
///
/// Strings become a one-element list, arrays keep their string members and
/// anything else becomes an empty list.
#[must_use]
pub fn normalize_list(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s.to_owned()]
            }
        }
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Append `item` unless it is already present. Returns whether it was added.
pub fn add_to_list(list: &mut Vec<String>, item: &str) -> bool {
    if list.iter().any(|existing| existing == item) {
        false
    } else {
        list.push(item.to_owned());
        true
    }
}

/// Remove every occurrence of `item`. Returns whether anything was removed.
pub fn remove_from_list(list: &mut Vec<String>, item: &str) -> bool {
    let before = list.len();
    list.retain(|existing| existing != item);
    list.len() != before
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_fields() {
        let title = MarketingField::parse("suggested_title").unwrap();
        assert_eq!(title.column(), "suggested_title");
        assert_eq!(title.kind(), FieldKind::Text);

        let keywords = MarketingField::parse("keywords").unwrap();
        assert_eq!(keywords.kind(), FieldKind::List);
    }

    #[test]
    fn test_parse_rejects_unknown_and_injection() {
        assert_eq!(
            MarketingField::parse("sku = 'x'; --"),
            Err(MarketingError::InvalidField)
        );
        assert_eq!(
            MarketingError::InvalidField.to_string(),
            "Invalid field name."
        );
    }

    #[test]
    fn test_kind_specific_parsers() {
        assert!(MarketingField::parse_text("keywords").is_err());
        assert!(MarketingField::parse_list("brand_voice").is_err());
        assert!(MarketingField::parse_list("market_trends").is_ok());
    }

    #[test]
    fn test_confidence_score_validation() {
        let field = MarketingField::parse_text("confidence_score").unwrap();
        assert_eq!(field.normalize_text("0.85").unwrap().as_deref(), Some("0.85"));
        assert_eq!(field.normalize_text("  ").unwrap(), None);
        assert_eq!(
            field.normalize_text("1.5"),
            Err(MarketingError::InvalidConfidence)
        );
        assert_eq!(
            field.normalize_text("high"),
            Err(MarketingError::InvalidConfidence)
        );
    }

    #[test]
    fn test_normalize_list() {
        let value = serde_json::json!(["  cozy ", "", 3, "gift"]);
        assert_eq!(normalize_list(&value), vec!["cozy", "gift"]);
        assert_eq!(normalize_list(&serde_json::json!("solo")), vec!["solo"]);
        assert!(normalize_list(&serde_json::json!(null)).is_empty());
    }

    #[test]
    fn test_list_editing() {
        let mut list = vec!["a".to_owned()];
        assert!(add_to_list(&mut list, "b"));
        assert!(!add_to_list(&mut list, "a"));
        assert_eq!(list, vec!["a", "b"]);
        assert!(remove_from_list(&mut list, "a"));
        assert!(!remove_from_list(&mut list, "z"));
        assert_eq!(list, vec!["b"]);
    }
}
