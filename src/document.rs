//! Self-describing document model.
//!
//! Every record, card and manifest that crosses this crate is held as a
//! [`Document`]: a JSON value whose objects keep their insertion order
//! (`serde_json` is built with `preserve_order`). Translators work on
//! documents rather than generated structs so that fields nobody here
//! knows about survive a round trip.

use serde_json::{Map, Value};

use crate::error::DocumentError;

/// A JSON-like tree of null, bool, number, string, list and map.
pub type Document = Value;

/// Parse a document from raw JSON bytes.
///
/// # Errors
///
/// Returns `DocumentError::InvalidJson` if the bytes aren't valid JSON.
pub fn parse(bytes: &[u8]) -> Result<Document, DocumentError> {
    serde_json::from_slice(bytes).map_err(|source| DocumentError::InvalidJson { source })
}

/// Parse a document from a JSON string.
///
/// # Errors
///
/// Returns `DocumentError::InvalidJson` if the string isn't valid JSON.
pub fn parse_str(content: &str) -> Result<Document, DocumentError> {
    serde_json::from_str(content).map_err(|source| DocumentError::InvalidJson { source })
}

/// Serialize a document to compact JSON bytes, keeping map key order.
pub fn to_bytes(doc: &Document) -> Vec<u8> {
    // Serializing a Value only fails for non-string map keys, which Value can't hold.
    serde_json::to_vec(doc).unwrap_or_default()
}

/// Serialize a document to compact or pretty JSON text.
pub fn to_string(doc: &Document, pretty: bool) -> String {
    let out = if pretty {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    };
    out.unwrap_or_default()
}

/// Borrow the root map of a document.
///
/// # Errors
///
/// Returns `DocumentError::NotAnObject` for any non-object root.
pub fn as_map(doc: &Document) -> Result<&Map<String, Value>, DocumentError> {
    doc.as_object().ok_or_else(|| DocumentError::NotAnObject {
        actual: json_type_name(doc).to_string(),
    })
}

/// True for `null`, `{}`, `[]` and `""`.
pub fn is_empty(doc: &Document) -> bool {
    match doc {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Look up a value by dotted path.
///
/// Segments are separated by `.`; a segment may carry list indexes in
/// brackets (`servers[0]`) and a bare numeric segment also indexes a list
/// (`servers.0`). Returns `None` as soon as a segment doesn't resolve.
///
/// ```
/// use oasf_sdk::document::get_path;
/// use serde_json::json;
///
/// let doc = json!({"modules": [{"data": {"servers": [{"name": "github"}]}}]});
/// assert_eq!(get_path(&doc, "modules[0].data.servers.0.name"), Some(&json!("github")));
/// assert_eq!(get_path(&doc, "modules[1]"), None);
/// ```
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }

    let mut current = doc;
    for segment in path.split('.') {
        let (key, indexes) = split_indexes(segment)?;
        if !key.is_empty() {
            current = match current {
                Value::Object(map) => map.get(key)?,
                Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        for idx in indexes {
            current = current.as_array()?.get(idx)?;
        }
    }
    Some(current)
}

/// Split `name[1][2]` into `("name", [1, 2])`.
fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };

    let key = &segment[..open];
    let mut indexes = Vec::new();
    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((key, indexes))
}

/// String value of `key`, if present and a string.
pub fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// First non-empty string among several spellings of the same field.
pub fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| str_field(map, key))
        .find(|s| !s.is_empty())
}

/// First present value among several spellings that isn't null or empty.
pub fn first_value<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !is_empty(v))
}

/// Non-empty string at `key`, or `default`.
pub fn str_or<'a>(map: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    match str_field(map, key) {
        Some(s) if !s.trim().is_empty() => s,
        _ => default,
    }
}

/// Strings of a list field. Non-string entries are skipped.
pub fn str_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
