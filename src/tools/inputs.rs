//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! All input structs implement `sanitize()` which trims whitespace
//! from string fields. This should be called before processing input.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{EngineCriterion, SearchText};

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// A `field contains value` filter.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchTextInput {
    /// Field name (e.g. "name", "serial").
    pub field: String,

    /// Text the field must contain (case-insensitive).
    pub value: String,
}

impl From<SearchTextInput> for SearchText {
    fn from(input: SearchTextInput) -> Self {
        SearchText::new(input.field.trim(), input.value.trim())
    }
}

/// Input parameters for the get_item tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetItemInput {
    /// Item type (e.g. "ticket", "Computer", "user") or a path such as "getFullSession".
    pub item_type: String,

    /// Numeric ID of the item. Omit to fetch the item type path itself.
    #[serde(default)]
    pub id: Option<String>,

    /// Resolve dropdown ids to their display names.
    #[serde(default)]
    pub expand_dropdowns: Option<bool>,
}

impl GetItemInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            id: trim_option(&self.id),
            expand_dropdowns: self.expand_dropdowns,
        }
    }
}

/// Input parameters for the list_items tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListItemsInput {
    /// Item type to list (e.g. "ticket", "Computer").
    pub item_type: String,

    /// Resolve dropdown ids to their display names.
    #[serde(default)]
    pub expand_dropdowns: Option<bool>,

    /// Server-side text filters. Without filters the first 5000 items are returned.
    #[serde(default)]
    pub search_text: Option<Vec<SearchTextInput>>,
}

impl ListItemsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            expand_dropdowns: self.expand_dropdowns,
            search_text: self.search_text,
        }
    }

    /// The filters as model values.
    pub fn filters(&self) -> Vec<SearchText> {
        self.search_text
            .iter()
            .flatten()
            .cloned()
            .map(SearchText::from)
            .collect()
    }
}

/// Input parameters for the search_items tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchItemsInput {
    /// Item type to search (e.g. "ticket", "Computer").
    pub item_type: String,

    /// Items matching any of these filters are returned.
    pub criteria: Vec<SearchTextInput>,

    /// Resolve dropdown ids to their display names.
    #[serde(default)]
    pub expand_dropdowns: Option<bool>,
}

impl SearchItemsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            criteria: self.criteria,
            expand_dropdowns: self.expand_dropdowns,
        }
    }

    /// The `{"criteria": [...]}` document understood by the router.
    pub fn criteria_document(&self) -> Value {
        let criteria: Vec<SearchText> = self.criteria.iter().cloned().map(SearchText::from).collect();
        serde_json::json!({ "criteria": criteria })
    }
}

/// One criterion of a search engine query.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EngineCriterionInput {
    /// Field name: name, id, location, type, serialnumber, body, tags,
    /// processor, lastupdate, manufacturer, status, model, operatingsystem.
    pub field: String,

    /// Value to match. Omit for an empty value.
    #[serde(default)]
    pub value: Option<String>,

    /// Match type (default "contains").
    #[serde(default)]
    pub searchtype: Option<String>,

    /// Link with the previous criterion (default "AND").
    #[serde(default)]
    pub link: Option<String>,
}

impl From<EngineCriterionInput> for EngineCriterion {
    fn from(input: EngineCriterionInput) -> Self {
        let mut criterion = EngineCriterion::contains(input.field.trim(), "");
        criterion.value = input.value;
        if let Some(searchtype) = trim_option(&input.searchtype) {
            criterion.searchtype = searchtype;
        }
        if let Some(link) = trim_option(&input.link) {
            criterion.link = link;
        }
        criterion
    }
}

/// Input parameters for the search_engine tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchEngineInput {
    /// Item type to search (e.g. "Computer", "Knowbaseitem").
    pub item_type: String,

    /// Criteria combined in order.
    pub criteria: Vec<EngineCriterionInput>,
}

impl SearchEngineInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            criteria: self.criteria,
        }
    }

    /// The criteria as model values.
    pub fn engine_criteria(&self) -> Vec<EngineCriterion> {
        self.criteria.iter().cloned().map(EngineCriterion::from).collect()
    }
}

/// Input parameters for the list_search_options tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchOptionsInput {
    /// Item type whose search options are listed (e.g. "Computer").
    pub item_type: String,
}

impl SearchOptionsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
        }
    }
}

// ============================================================================
// Write operation input structs
// ============================================================================

/// Input parameters for the create_item tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateItemInput {
    /// Item type to create (e.g. "ticket", "Computer").
    pub item_type: String,

    /// Field values of the new item, e.g. {"name": "Printer down", "content": "..."}.
    pub fields: Map<String, Value>,
}

impl CreateItemInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            fields: self.fields,
        }
    }
}

/// Input parameters for the update_item tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateItemInput {
    /// Item type (e.g. "ticket", "Computer").
    pub item_type: String,

    /// Numeric ID of the item to update.
    pub id: String,

    /// Fields to change.
    pub fields: Map<String, Value>,
}

impl UpdateItemInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            id: self.id.trim().to_string(),
            fields: self.fields,
        }
    }

    /// Returns true if at least one field is provided for update.
    pub fn has_updates(&self) -> bool {
        self.fields.keys().any(|k| k != "id")
    }
}

/// Input parameters for the delete_item tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteItemInput {
    /// Item type (e.g. "ticket", "Computer").
    pub item_type: String,

    /// Numeric ID of the item to delete.
    pub id: String,

    /// Delete permanently instead of moving to the trash.
    #[serde(default)]
    pub force_purge: Option<bool>,
}

impl DeleteItemInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            item_type: self.item_type.trim().to_string(),
            id: self.id.trim().to_string(),
            force_purge: self.force_purge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim_option_trims_whitespace() {
        let s = Some("  hello  ".to_string());
        assert_eq!(trim_option(&s), Some("hello".to_string()));
    }

    #[test]
    fn test_trim_option_filters_empty() {
        let s = Some("   ".to_string());
        assert_eq!(trim_option(&s), None);
    }

    #[test]
    fn test_get_item_input_sanitize() {
        let input: GetItemInput =
            serde_json::from_value(json!({"item_type": "  ticket ", "id": "  "})).unwrap();
        let sanitized = input.sanitize();
        assert_eq!(sanitized.item_type, "ticket");
        assert_eq!(sanitized.id, None);
        assert_eq!(sanitized.expand_dropdowns, None);
    }

    #[test]
    fn test_list_items_filters() {
        let input: ListItemsInput = serde_json::from_value(json!({
            "item_type": "Computer",
            "search_text": [{"field": " name ", "value": " srv "}]
        }))
        .unwrap();
        assert_eq!(input.filters(), vec![SearchText::new("name", "srv")]);
    }

    #[test]
    fn test_search_items_criteria_document() {
        let input: SearchItemsInput = serde_json::from_value(json!({
            "item_type": "Computer",
            "criteria": [{"field": "name", "value": "server"}]
        }))
        .unwrap();
        assert_eq!(
            input.criteria_document(),
            json!({"criteria": [{"field": "name", "value": "server"}]})
        );
    }

    #[test]
    fn test_engine_criterion_input_defaults() {
        let input: EngineCriterionInput =
            serde_json::from_value(json!({"field": "name", "value": "srv"})).unwrap();
        let criterion = EngineCriterion::from(input);
        assert_eq!(criterion.searchtype, "contains");
        assert_eq!(criterion.link, "AND");
        assert_eq!(criterion.value.as_deref(), Some("srv"));
    }

    #[test]
    fn test_engine_criterion_input_overrides() {
        let input: EngineCriterionInput = serde_json::from_value(json!({
            "field": "status", "searchtype": "equals", "link": "OR"
        }))
        .unwrap();
        let criterion = EngineCriterion::from(input);
        assert_eq!(criterion.searchtype, "equals");
        assert_eq!(criterion.link, "OR");
        assert_eq!(criterion.value, None);
    }

    #[test]
    fn test_update_item_input_has_updates() {
        let input: UpdateItemInput = serde_json::from_value(json!({
            "item_type": "ticket", "id": "3", "fields": {"id": 3}
        }))
        .unwrap();
        assert!(!input.has_updates());

        let input: UpdateItemInput = serde_json::from_value(json!({
            "item_type": "ticket", "id": "3", "fields": {"status": 5}
        }))
        .unwrap();
        assert!(input.has_updates());
    }
}
