//! Canonical JSON encoding shared by content hashing, config fingerprinting,
//! and artifact hashing.
//!
//! `serde_json`'s default `Map` is `BTreeMap`-backed (the `preserve_order`
//! feature, which would switch it to insertion-order `IndexMap`, is not
//! enabled), so `serde_json::to_value` already yields sorted object keys;
//! `serde_json::to_string` already emits the compact `","`/`":"` separators
//! with no whitespace. Together that's exactly the canonical form spec.md
//! requires — this module exists so every hash site goes through the same
//! function rather than re-deriving that property.

use sha2::{Digest, Sha256};

pub fn canonical_json<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let as_value = serde_json::to_value(value)?;
    serde_json::to_string(&as_value)
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_sorted() {
        let value = serde_json::json!({"b": 1, "a": 2, "c": 3});
        let encoded = canonical_json(&value).unwrap();
        assert_eq!(encoded, r#"{"a":2,"b":1,"c":3}"#);
    }

    #[test]
    fn hash_is_deterministic() {
        let a = sha256_hex("hello");
        let b = sha256_hex("hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// spec.md §8: `artifact_hash(payload) == artifact_hash(payload')`
        /// whenever the payloads have the same canonical JSON. Key
        /// insertion order must not change the hash, since canonical_json
        /// always sorts keys.
        #[test]
        fn hash_is_stable_across_key_insertion_order(a in 0i64..1000, b in 0i64..1000) {
            let forward = serde_json::json!({"a": a, "b": b});
            let backward = serde_json::json!({"b": b, "a": a});
            let left = canonical_json(&forward).unwrap();
            let right = canonical_json(&backward).unwrap();
            prop_assert_eq!(left, right);
            prop_assert_eq!(sha256_hex(&canonical_json(&forward).unwrap()), sha256_hex(&canonical_json(&backward).unwrap()));
        }

        #[test]
        fn sha256_hex_is_always_64_lowercase_hex_chars(input in ".{0,64}") {
            let hash = sha256_hex(&input);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
