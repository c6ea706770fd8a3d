// src/digest.rs
//
// Deterministic digest of a canonicalized JSON value. Used for trigger
// identity derivation and as the fallback deduplication key. Not a security
// boundary; stability across runs and builds is the only requirement.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex SHA-256 (truncated to 16 bytes) of the canonical rendering of `value`.
///
/// Object keys are sorted recursively before hashing, so two deeply-equal
/// values produce the same digest regardless of construction order.
pub fn content_digest(value: &Value) -> String {
    let mut canon = String::new();
    write_canonical(value, &mut canon);

    let mut hasher = Sha256::new();
    hasher.update(canon.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// Canonical form: JSON with object keys in ascending byte order and no
// insignificant whitespace. Hand-rolled so the result does not depend on
// serde_json's map-ordering feature flags.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // serde_json renders scalars deterministically (incl. escaping).
            out.push_str(&serde_json::to_string(value).unwrap_or_default());
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
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
    }
}
