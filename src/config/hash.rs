//! Effective-config hashing
//!
//! Every output row carries the hex digest of the effective (defaults-merged)
//! config that produced it, so stale rows are detectable after a config edit.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a JSON value with all object keys sorted, no whitespace.
/// Two semantically equal configs always produce the same string.
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
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).expect("string key"));
                out.push(':');
                write_canonical(&map[*k], out);
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
        other => out.push_str(&other.to_string()),
    }
}

/// Hex SHA-256 of the canonical rendering of the effective config
pub fn config_hash(effective: &Value) -> String {
    let canonical = canonical_json(effective);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        write!(hex, "{:02x}", byte).expect("hex write");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_sorts_keys() {
        let a = json!({"b": 1, "a": {"z": true, "y": [1, 2]}});
        assert_eq!(canonical_json(&a), r#"{"a":{"y":[1,2],"z":true},"b":1}"#);
    }

    #[test]
    fn test_hash_stable_under_key_order() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = json!({"rate": 0.0015});
        let b = json!({"rate": 0.0016});
        assert_ne!(config_hash(&a), config_hash(&b));
        assert_eq!(config_hash(&a).len(), 64);
    }

    #[test]
    fn test_rehash_of_effective_default_is_stable() {
        // Serializing and rehashing the same effective config yields the
        // same digest (determinism for downstream staleness checks)
        let v = crate::config::defaults::default_value(crate::config::Metric::Sip);
        assert_eq!(config_hash(&v), config_hash(&v.clone()));
    }
}
