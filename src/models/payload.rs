//! Request bodies sent to GLPI and item id validation.

use serde_json::{json, Map, Value};

use crate::error::GlpiError;

/// Wraps item fields in the `{"input": {...}}` envelope used by create and
/// update.
/// Carriage returns are removed from string values.
pub fn input_envelope(data: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = data
        .iter()
        .map(|(key, value)| (key.clone(), strip_carriage_returns(value)))
        .collect();
    json!({ "input": fields })
}

fn strip_carriage_returns(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('\r', "")),
        Value::Array(items) => Value::Array(items.iter().map(strip_carriage_returns).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), strip_carriage_returns(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Builds the delete body, with `force_purge` inside `input` when requested.
pub fn delete_envelope(id: u64, force_purge: bool) -> Value {
    if force_purge {
        json!({ "input": { "id": id, "force_purge": true } })
    } else {
        json!({ "input": { "id": id } })
    }
}

/// Parses an item id given as text.
///
/// GLPI ids are non-negative integers. Rejecting anything else also keeps
/// path fragments out of the URLs built from ids.
///
/// # Errors
///
/// Returns `GlpiError::Validation` if the id is empty or not all digits.
pub fn parse_item_id(id: &str) -> Result<u64, GlpiError> {
    let trimmed = id.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GlpiError::validation(format!(
            "item id must be an integer, got: {:?}",
            id.chars().take(50).collect::<String>()
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| GlpiError::validation(format!("item id out of range: {}", trimmed)))
}

/// Reads the mandatory `id` of an update payload.
///
/// Accepts an integer or a string of digits.
///
/// # Errors
///
/// Returns `GlpiError::Validation` if `id` is missing or not an integer.
pub fn item_id_from_data(data: &Map<String, Value>) -> Result<u64, GlpiError> {
    match data.get("id") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| GlpiError::validation(format!("item id must be an integer, got: {}", n))),
        Some(Value::String(s)) => parse_item_id(s),
        Some(other) => Err(GlpiError::validation(format!(
            "item id must be an integer, got: {}",
            other
        ))),
        None => Err(GlpiError::validation("update data must include an \"id\" key")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_input_envelope_keeps_value_kinds() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("Printer \"B\"\nfloor 2"));
        data.insert("entities_id".to_string(), json!(0));
        data.insert("comment".to_string(), Value::Null);

        let envelope = input_envelope(&data);
        assert_eq!(
            envelope,
            json!({"input": {"name": "Printer \"B\"\nfloor 2", "entities_id": 0, "comment": null}})
        );

        // escaping is handled by the encoder
        let text = envelope.to_string();
        assert!(text.contains(r#"Printer \"B\"\nfloor 2"#));
    }

    #[test]
    fn test_input_envelope_strips_carriage_returns() {
        let mut data = Map::new();
        data.insert("content".to_string(), json!("line1\r\nline2\r\n"));
        data.insert("tags".to_string(), json!(["a\r", {"note": "b\r\nc"}]));
        data.insert("status".to_string(), json!(2));

        let envelope = input_envelope(&data);
        assert_eq!(
            envelope,
            json!({"input": {
                "content": "line1\nline2\n",
                "tags": ["a", {"note": "b\nc"}],
                "status": 2
            }})
        );
        assert!(!envelope.to_string().contains("\\r"));
    }

    #[test]
    fn test_delete_envelope() {
        assert_eq!(delete_envelope(7, false), json!({"input": {"id": 7}}));
        assert_eq!(
            delete_envelope(7, true),
            json!({"input": {"id": 7, "force_purge": true}})
        );
    }

    #[test]
    fn test_parse_item_id() {
        assert_eq!(parse_item_id("42").unwrap(), 42);
        assert_eq!(parse_item_id(" 0 ").unwrap(), 0);
        assert!(parse_item_id("abc").is_err());
        assert!(parse_item_id("").is_err());
        assert!(parse_item_id("-1").is_err());
        assert!(parse_item_id("12/34").is_err());
        assert!(parse_item_id("99999999999999999999999").is_err());
    }

    #[test]
    fn test_item_id_from_data() {
        let mut data = Map::new();
        assert!(item_id_from_data(&data).is_err());

        data.insert("id".to_string(), json!(5));
        assert_eq!(item_id_from_data(&data).unwrap(), 5);

        data.insert("id".to_string(), json!("6"));
        assert_eq!(item_id_from_data(&data).unwrap(), 6);

        data.insert("id".to_string(), json!(1.5));
        assert!(item_id_from_data(&data).is_err());

        data.insert("id".to_string(), json!(true));
        assert!(item_id_from_data(&data).is_err());
    }
}
