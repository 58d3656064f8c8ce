//! Stable SHA-256 digests over canonical JSON.
//!
//! Values are routed through `serde_json::Value`, whose object maps are
//! key-sorted, so field order in the Rust type never changes a digest.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of raw bytes.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Canonical JSON bytes for `value` (sorted object keys, compact form).
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let normalized = serde_json::to_value(value)?;
    serde_json::to_vec(&normalized)
}

/// SHA-256 hex digest of the canonical JSON form of `value`.
pub fn digest_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(digest_bytes(&canonical_json(value)?))
}

/// First `n` hex characters of a digest.
pub fn short(digest: &str, n: usize) -> &str {
    &digest[..n.min(digest.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_bytes_known_vector() {
        assert_eq!(
            digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_json_is_key_order_independent() {
        let a = json!({"b": 1, "a": [1, 2]});
        let b = json!({"a": [1, 2], "b": 1});
        assert_eq!(digest_json(&a).unwrap(), digest_json(&b).unwrap());
    }

    #[test]
    fn test_digest_json_array_order_sensitive() {
        let a = json!([1, 2]);
        let b = json!([2, 1]);
        assert_ne!(digest_json(&a).unwrap(), digest_json(&b).unwrap());
    }

    #[test]
    fn test_short() {
        assert_eq!(short("abcdef", 3), "abc");
        assert_eq!(short("ab", 8), "ab");
    }
}
