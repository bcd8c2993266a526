//! Search criteria and the query strings built from them.
//!
//! GLPI offers two ways to search: `searchText[...]` filters on a collection
//! endpoint, and the `search` engine endpoint which addresses fields by
//! numeric search option ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GlpiError;

/// Fixed range requested from collection and search endpoints.
pub const DEFAULT_RANGE: &str = "0-5000";

/// Search option ids understood by [`engine_query`].
const FIELD_CODES: &[(&str, u32)] = &[
    ("name", 1),
    ("id", 2),
    ("location", 3),
    ("type", 4),
    ("serialnumber", 5),
    ("body", 6),
    ("tags", 10500),
    ("processor", 17),
    ("lastupdate", 19),
    ("manufacturer", 23),
    ("status", 31),
    ("model", 40),
    ("operatingsystem", 45),
];

/// A `field contains value` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchText {
    /// Field to look at.
    pub field: String,
    /// Text to look for.
    pub value: String,
}

impl SearchText {
    /// Creates a new filter.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One criterion of a search engine query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCriterion {
    /// Field name, mapped to a search option id.
    pub field: String,

    /// Value to match; `None` sends an empty value.
    #[serde(default)]
    pub value: Option<String>,

    /// Match type: "contains", "equals", "notequals", "lessthan", ...
    #[serde(default = "default_searchtype")]
    pub searchtype: String,

    /// Logical link with the previous criterion: "AND", "OR", "AND NOT", ...
    #[serde(default = "default_link")]
    pub link: String,
}

fn default_searchtype() -> String {
    "contains".to_string()
}

fn default_link() -> String {
    "AND".to_string()
}

impl EngineCriterion {
    /// Creates a `contains` criterion linked with AND.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
            searchtype: default_searchtype(),
            link: default_link(),
        }
    }
}

/// The two search shapes accepted by the router's `search`.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Client-side filtering over every item of a type.
    Criteria(Vec<SearchText>),
    /// Cross-item search. Not supported.
    MetaCriteria(Vec<Value>),
}

impl SearchQuery {
    /// Reads a `{"criteria": [...]}` or `{"metacriteria": [...]}` document.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation` when neither key is present or the
    /// criteria list is malformed.
    pub fn from_value(value: &Value) -> Result<Self, GlpiError> {
        if let Some(criteria) = value.get("criteria") {
            let criteria: Vec<SearchText> = serde_json::from_value(criteria.clone())
                .map_err(|e| GlpiError::validation(format!("invalid search criteria: {}", e)))?;
            Ok(SearchQuery::Criteria(criteria))
        } else if let Some(meta) = value.get("metacriteria") {
            let meta = match meta {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            Ok(SearchQuery::MetaCriteria(meta))
        } else {
            Err(GlpiError::validation("Unable to find a valid criteria."))
        }
    }
}

/// Returns the search option id for a field name.
pub fn field_code(field: &str) -> Option<u32> {
    FIELD_CODES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, code)| *code)
}

/// Builds the query string for listing a collection.
///
/// Without criteria this asks for the default range.
pub fn search_text_query(criteria: &[SearchText]) -> String {
    if criteria.is_empty() {
        return format!("?range={}", DEFAULT_RANGE);
    }

    let filters: Vec<String> = criteria
        .iter()
        .map(|c| {
            format!(
                "searchText[{}]={}",
                urlencoding::encode(&c.field),
                urlencoding::encode(&c.value)
            )
        })
        .collect();
    format!("?{}", filters.join("&"))
}

/// Builds the `search` engine path and query for `item_name`.
///
/// # Errors
///
/// Returns `GlpiError::Lookup` for a field without a search option id.
pub fn engine_query(item_name: &str, criteria: &[EngineCriterion]) -> Result<String, GlpiError> {
    let mut params = Vec::with_capacity(criteria.len() * 4 + 1);

    for (i, criterion) in criteria.iter().enumerate() {
        let code = field_code(&criterion.field).ok_or_else(|| GlpiError::lookup(&criterion.field))?;
        let value = criterion
            .value
            .as_deref()
            .map(urlencoding::encode)
            .unwrap_or_default();

        params.push(format!("criteria[{}][field]={}", i, code));
        params.push(format!("criteria[{}][value]={}", i, value));
        params.push(format!(
            "criteria[{}][searchtype]={}",
            i,
            urlencoding::encode(&criterion.searchtype)
        ));
        params.push(format!(
            "criteria[{}][link]={}",
            i,
            urlencoding::encode(&criterion.link)
        ));
    }
    params.push(format!("range={}", DEFAULT_RANGE));

    Ok(format!(
        "{}?{}",
        urlencoding::encode(item_name),
        params.join("&")
    ))
}

/// Keeps the records where at least one criterion matches.
///
/// A criterion matches when its value is a case-insensitive substring of the
/// record's field. Missing fields and nested values never match.
pub fn filter_records(records: &[Value], criteria: &[SearchText]) -> Vec<Value> {
    records
        .iter()
        .filter(|record| {
            criteria.iter().any(|criterion| {
                field_text(record, &criterion.field)
                    .map(|text| {
                        text.to_lowercase()
                            .contains(&criterion.value.to_lowercase())
                    })
                    .unwrap_or(false)
            })
        })
        .cloned()
        .collect()
}

fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_field_codes() {
        assert_eq!(field_code("name"), Some(1));
        assert_eq!(field_code("tags"), Some(10500));
        assert_eq!(field_code("operatingsystem"), Some(45));
        assert_eq!(field_code("colour"), None);
    }

    #[test]
    fn test_search_text_query_default_range() {
        assert_eq!(search_text_query(&[]), "?range=0-5000");
    }

    #[test]
    fn test_search_text_query_joins_filters() {
        let query = search_text_query(&[
            SearchText::new("name", "web server"),
            SearchText::new("serial", "ABC"),
        ]);
        assert_eq!(query, "?searchText[name]=web%20server&searchText[serial]=ABC");
    }

    #[test]
    fn test_search_text_query_encodes_field_names() {
        let query = search_text_query(&[SearchText::new("a&b#c", "x")]);
        assert_eq!(query, "?searchText[a%26b%23c]=x");
    }

    #[test]
    fn test_engine_query_encodes_item_name() {
        let query = engine_query("Odd#Item&x", &[EngineCriterion::contains("name", "a")]).unwrap();
        assert!(query.starts_with("Odd%23Item%26x?criteria[0][field]=1"));
        assert!(!query.contains('#'));
    }

    #[test]
    fn test_engine_query() {
        let criteria = vec![
            EngineCriterion::contains("body", "sites-multimidia"),
            EngineCriterion {
                field: "id".to_string(),
                value: None,
                searchtype: "contains".to_string(),
                link: "AND".to_string(),
            },
        ];
        let query = engine_query("Knowbaseitem", &criteria).unwrap();
        assert_eq!(
            query,
            "Knowbaseitem?criteria[0][field]=6&criteria[0][value]=sites-multimidia\
             &criteria[0][searchtype]=contains&criteria[0][link]=AND\
             &criteria[1][field]=2&criteria[1][value]=\
             &criteria[1][searchtype]=contains&criteria[1][link]=AND\
             &range=0-5000"
        );
    }

    #[test]
    fn test_engine_query_unmapped_field() {
        let err = engine_query("Computer", &[EngineCriterion::contains("colour", "red")]).unwrap_err();
        assert!(matches!(err, GlpiError::Lookup { ref field } if field == "colour"));
    }

    #[test]
    fn test_engine_criterion_defaults() {
        let criterion: EngineCriterion =
            serde_json::from_value(json!({"field": "name", "value": "srv"})).unwrap();
        assert_eq!(criterion.searchtype, "contains");
        assert_eq!(criterion.link, "AND");
    }

    #[test]
    fn test_filter_records_case_insensitive() {
        let records = vec![
            json!({"id": 1, "name": "Web-SERVER-01"}),
            json!({"id": 2, "name": "laptop"}),
            json!({"id": 3}),
            json!({"id": 4, "name": "fileserver"}),
        ];
        let kept = filter_records(&records, &[SearchText::new("name", "server")]);
        let ids: Vec<i64> = kept.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_filter_records_any_criterion() {
        let records = vec![
            json!({"id": 1, "name": "alpha", "serial": "X1"}),
            json!({"id": 2, "name": "beta", "serial": "Y2"}),
        ];
        let kept = filter_records(
            &records,
            &[SearchText::new("name", "zzz"), SearchText::new("serial", "y")],
        );
        assert_eq!(kept, vec![records[1].clone()]);
    }

    #[test]
    fn test_filter_records_numeric_field() {
        let records = vec![json!({"id": 120}), json!({"id": 7})];
        let kept = filter_records(&records, &[SearchText::new("id", "12")]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_search_query_dispatch() {
        let criteria = SearchQuery::from_value(&json!({
            "criteria": [{"field": "name", "value": "server"}]
        }))
        .unwrap();
        assert_eq!(
            criteria,
            SearchQuery::Criteria(vec![SearchText::new("name", "server")])
        );

        let meta = SearchQuery::from_value(&json!({"metacriteria": [{"link": "AND"}]})).unwrap();
        assert!(matches!(meta, SearchQuery::MetaCriteria(ref items) if items.len() == 1));

        let err = SearchQuery::from_value(&json!({"other": []})).unwrap_err();
        assert!(matches!(err, GlpiError::Validation(_)));
    }
}
