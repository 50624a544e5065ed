//! Case-insensitive property matching for incoming JSON documents.
//!
//! serde matches field names exactly, so documents are re-keyed onto the
//! canonical camelCase names before typed decoding. Only the listed schema
//! properties are touched; free-form payloads (template patches, value maps)
//! keep their keys verbatim.

use serde_json::{Map, Value};

/// Rename keys of `obj` that match one of `canonical` ignoring ASCII case.
///
/// If both an exact and a differently-cased key are present, the exact one
/// wins and the other is dropped.
pub fn rekey_object(obj: &mut Map<String, Value>, canonical: &[&str]) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for key in keys {
        let Some(name) = canonical.iter().find(|c| c.eq_ignore_ascii_case(&key)) else {
            continue;
        };
        if *name == key {
            continue;
        }
        if let Some(v) = obj.remove(&key) {
            obj.entry(name.to_string()).or_insert(v);
        }
    }
}

/// Re-key every object in the array stored under `key` (if any).
pub fn rekey_array_items(
    obj: &mut Map<String, Value>,
    key: &str,
    canonical: &[&str],
    mut nested: impl FnMut(&mut Map<String, Value>),
) {
    if let Some(Value::Array(items)) = obj.get_mut(key) {
        for item in items {
            if let Value::Object(inner) = item {
                rekey_object(inner, canonical);
                nested(inner);
            }
        }
    }
}
