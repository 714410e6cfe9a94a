// src/api/normalize.rs
//! Envelope handling for RapidDNS responses.
//!
//! The API wraps its payload differently depending on the endpoint. Each
//! matcher below recognises one wrapper and returns the payload container;
//! they are tried in order and the first hit wins. Decode failures inside a
//! wrapper are never errors, the next matcher simply gets its turn.
use crate::types::Record;
use log::debug;
use serde_json::Value;

type Matcher = fn(&Value) -> Option<Value>;

const MATCHERS: [(&str, Matcher); 4] = [
    ("message-string", message_string),
    ("data-string", data_string),
    ("data-value", data_value),
    ("flat", flat),
];

/// `{"message": "<json with data or result>"}`
fn message_string(raw: &Value) -> Option<Value> {
    let text = raw.get("message")?.as_str()?;
    let decoded: Value = serde_json::from_str(text).ok()?;
    if has_field(&decoded, "data") || has_field(&decoded, "result") {
        Some(decoded)
    } else {
        None
    }
}

/// `{"data": "<json>"}`
fn data_string(raw: &Value) -> Option<Value> {
    let text = raw.get("data")?.as_str()?;
    serde_json::from_str(text).ok()
}

/// `{"data": [...]}` or `{"data": {...}}`
fn data_value(raw: &Value) -> Option<Value> {
    match raw.get("data")? {
        data @ (Value::Array(_) | Value::Object(_)) => Some(data.clone()),
        _ => None,
    }
}

/// `{"result": ...}` at top level.
fn flat(raw: &Value) -> Option<Value> {
    if has_field(raw, "result") || matches!(raw.get("data"), Some(Value::Array(_))) {
        Some(raw.clone())
    } else {
        None
    }
}

fn has_field(value: &Value, field: &str) -> bool {
    value.get(field).map_or(false, |v| !v.is_null())
}

/// Unwrap the payload container, or `None` when no known envelope matches.
pub fn normalize_envelope(raw: &Value) -> Option<Value> {
    for (name, matcher) in MATCHERS.iter() {
        if let Some(container) = matcher(raw) {
            debug!("Response matched {} envelope", name);
            return Some(container);
        }
    }
    None
}

/// Extract the record list of one page. `None` means "no data".
pub fn normalize(raw: &Value) -> Option<Vec<Record>> {
    normalize_envelope(raw).map(|container| records_from(&container))
}

fn records_from(container: &Value) -> Vec<Record> {
    let items = match container {
        Value::Array(items) => items,
        Value::Object(_) => match (container.get("data"), container.get("result")) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items.iter().filter_map(record_from).collect()
}

fn record_from(item: &Value) -> Option<Record> {
    if !item.is_object() {
        debug!("Skipping non-object record: {}", item);
        return None;
    }
    Some(Record {
        subdomain: text_field(item, "subdomain"),
        record_type: text_field(item, "type").unwrap_or_default(),
        value: text_field(item, "value").unwrap_or_default(),
        date: text_field(item, "date"),
    })
}

fn text_field(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!({"subdomain": format!("h{}.example.com", i), "type": "A", "value": format!("10.0.0.{}", i)}))
                .collect(),
        )
    }

    #[test]
    fn test_message_string_with_data() {
        let inner = json!({"data": rows(2)}).to_string();
        let records = normalize(&json!({"status": 200, "message": inner})).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subdomain.as_deref(), Some("h0.example.com"));
    }

    #[test]
    fn test_message_string_with_result() {
        let inner = json!({"result": rows(3), "total": 3}).to_string();
        assert_eq!(normalize(&json!({"message": inner})).unwrap().len(), 3);
    }

    #[test]
    fn test_plain_message_falls_through() {
        assert_eq!(normalize(&json!({"message": "ok"})), None);
        assert_eq!(normalize(&json!({"message": "{\"other\": 1}"})), None);
        // a plain message next to a data list still yields the list
        assert_eq!(normalize(&json!({"message": "ok", "data": rows(1)})).unwrap().len(), 1);
    }

    #[test]
    fn test_data_string_with_record_array() {
        let raw = json!({"data": rows(4).to_string()});
        assert_eq!(normalize(&raw).unwrap().len(), 4);
    }

    #[test]
    fn test_data_string_with_nested_object() {
        let raw = json!({"data": json!({"data": rows(2), "total": 2}).to_string()});
        assert_eq!(normalize(&raw).unwrap().len(), 2);
    }

    #[test]
    fn test_undecodable_data_string_falls_through() {
        assert_eq!(normalize(&json!({"data": "not json"})), None);
        let raw = json!({"data": "not json", "result": rows(1)});
        assert_eq!(normalize(&raw).unwrap().len(), 1);
    }

    #[test]
    fn test_data_list() {
        assert_eq!(normalize(&json!({"data": rows(5)})).unwrap().len(), 5);
    }

    #[test]
    fn test_data_object() {
        let raw = json!({"data": {"result": rows(2), "total": 2}});
        assert_eq!(normalize(&raw).unwrap().len(), 2);
    }

    #[test]
    fn test_top_level_result() {
        assert_eq!(normalize(&json!({"result": rows(2)})).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_shapes_are_not_found() {
        assert_eq!(normalize(&json!({})), None);
        assert_eq!(normalize(&json!({"error": "boom"})), None);
        assert_eq!(normalize(&json!({"data": null})), None);
        assert_eq!(normalize(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_empty_list_is_found_but_empty() {
        assert_eq!(normalize(&json!({"data": []})), Some(Vec::new()));
    }

    #[test]
    fn test_envelope_keeps_non_record_payload() {
        let container = normalize_envelope(&json!({"data": "{\"export_id\":\"abc123\"}"})).unwrap();
        assert_eq!(container["export_id"], "abc123");
    }

    #[test]
    fn test_record_fields_are_coerced() {
        let raw = json!({"data": [{"type": "A", "value": "1.2.3.4", "date": 20240101}, "junk"]});
        let records = normalize(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subdomain, None);
        assert_eq!(records[0].date.as_deref(), Some("20240101"));
    }

    #[test]
    fn test_earlier_envelope_wins_when_several_match() {
        let inner = json!({"data": [{"subdomain": "a.example.com", "type": "A", "value": "1.1.1.1"}]}).to_string();
        let raw = json!({"message": inner, "data": [{"subdomain": "b.example.com", "type": "A", "value": "2.2.2.2"}]});
        let values: Vec<String> = normalize(&raw).unwrap().into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec!["1.1.1.1"]);

        let raw = json!({"data": rows(1), "result": rows(2)});
        assert_eq!(normalize(&raw).unwrap().len(), 1);
        let raw = json!({"data": {"data": rows(1), "result": rows(2)}});
        assert_eq!(normalize(&raw).unwrap().len(), 1);
    }
}
