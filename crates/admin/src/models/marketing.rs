//! Marketing suggestion for one item.

use serde::Serialize;
use serde_json::{Map, Value};

use whimsical_frog_core::marketing::{LIST_FIELDS, TEXT_FIELDS, normalize_list};

/// Marketing copy for an item. Every known field is present, empty when unset.
#[derive(Debug, Clone, Serialize)]
pub struct MarketingSuggestion {
    pub sku: String,
    pub text: Vec<TextField>,
    pub lists: Vec<ListField>,
    /// Whether a row exists yet.
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextField {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListField {
    pub name: &'static str,
    pub items: Vec<String>,
}

/// Row of the marketing item list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MarketingItem {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub saved: bool,
}

impl MarketingSuggestion {
    /// Build from a row rendered as a JSON object (`to_jsonb(row)`).
    ///
    /// Missing or null columns become empty values.
    #[must_use]
    pub fn from_row(sku: &str, row: Option<&Map<String, Value>>) -> Self {
        let get = |name: &str| row.and_then(|r| r.get(name));
        Self {
            sku: sku.to_owned(),
            text: TEXT_FIELDS
                .iter()
                .map(|name| TextField {
                    name,
                    value: get(name)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_owned(),
                })
                .collect(),
            lists: LIST_FIELDS
                .iter()
                .map(|name| ListField {
                    name,
                    items: get(name).map(normalize_list).unwrap_or_default(),
                })
                .collect(),
            saved: row.is_some(),
        }
    }

    /// Flat JSON object: `{"sku": ..., "suggested_title": ..., "keywords": [...]}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("sku".to_owned(), Value::String(self.sku.clone()));
        for field in &self.text {
            map.insert(field.name.to_owned(), Value::String(field.value.clone()));
        }
        for field in &self.lists {
            map.insert(
                field.name.to_owned(),
                Value::Array(field.items.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(map)
    }
}

/// Human label for a column name, e.g. `call_to_action_suggestions` -> `Call to action suggestions`.
#[must_use]
pub fn field_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_missing_row_is_empty() {
        let suggestion = MarketingSuggestion::from_row("WF-TS-001", None);
        assert!(!suggestion.saved);
        assert_eq!(suggestion.text.len(), TEXT_FIELDS.len());
        assert_eq!(suggestion.lists.len(), LIST_FIELDS.len());
        assert!(suggestion.text.iter().all(|f| f.value.is_empty()));
    }

    #[test]
    fn test_from_row_reads_values() {
        let row = json!({
            "sku": "WF-TS-001",
            "brand_voice": "playful",
            "keywords": ["frog", "tee"],
            "selling_points": null
        });
        let suggestion = MarketingSuggestion::from_row("WF-TS-001", row.as_object());
        let voice = suggestion.text.iter().find(|f| f.name == "brand_voice").unwrap();
        assert_eq!(voice.value, "playful");
        let keywords = suggestion.lists.iter().find(|f| f.name == "keywords").unwrap();
        assert_eq!(keywords.items, vec!["frog", "tee"]);

        let flat = suggestion.to_json();
        assert_eq!(flat["brand_voice"], "playful");
        assert_eq!(flat["selling_points"], json!([]));
    }

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("call_to_action_suggestions"), "Call to action suggestions");
        assert_eq!(field_label(""), "");
    }
}
