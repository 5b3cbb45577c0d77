//! Content-addressed identifiers for map configs.
//!
//! A map config id is the blake3 digest of a canonical JSON rendering of the
//! config. The canonical form sorts object keys at every depth and emits no
//! whitespace, so two documents carrying the same content in a different key
//! order produce the same id.
//!
//! Keys are sorted explicitly rather than relying on `serde_json::Map`
//! ordering, which changes when any crate in the build enables
//! `serde_json/preserve_order`.

use serde_json::Value;

/// Renders `value` as compact JSON with object keys sorted lexicographically.
///
/// # Examples
///
/// ```
/// use layergroup_core::hash::canonical_json;
/// use serde_json::json;
///
/// let doc = json!({"b": 1, "a": {"d": [true, null], "c": "x"}});
/// assert_eq!(canonical_json(&doc), r#"{"a":{"c":"x","d":[true,null]},"b":1}"#);
/// ```
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Computes the hex-encoded blake3 digest of the canonical form of `value`.
#[must_use]
pub fn content_id(value: &Value) -> String {
    blake3::hash(canonical_json(value).as_bytes())
        .to_hex()
        .to_string()
}
