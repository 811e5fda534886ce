//! Content hashing and identity derivation.
//!
//! Everything the kernel identifies by value (actions, requests) is
//! addressed by a 32-byte BLAKE3 hash of a canonical JSON rendering, so the
//! same inputs always produce the same id regardless of field order.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

// ── ContentHash ──────────────────────────────────────────────────────────────

/// 32-byte BLAKE3 content hash, hex-encoded wherever it appears in JSON.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}…)", &self.to_hex()[..16])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentHash::from_hex(&s).map_err(D::Error::custom)
    }
}

// ── Hashing helpers ──────────────────────────────────────────────────────────

/// Compute BLAKE3 hash of arbitrary bytes → 32-byte array.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash any serializable value through its stable JSON rendering.
pub fn content_hash<T: Serialize>(value: &T) -> ContentHash {
    let v = serde_json::to_value(value).unwrap_or(Value::Null);
    ContentHash::from_bytes(blake3_hash(stable_json(&v).as_bytes()))
}

/// Render a JSON value with object keys sorted at every depth.
///
/// Deterministic regardless of how the value's maps were built, so two
/// semantically equal payloads always hash identically.
pub fn stable_json(value: &Value) -> String {
    let mut out = String::new();
    write_stable(value, &mut out);
    out
}

fn write_stable(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_stable(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_stable(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

// ── Identity ─────────────────────────────────────────────────────────────────

/// Derive the stable ledger scope for a user.
///
/// A user id wins over an email; emails are trimmed and lowercased so casing
/// differences collapse to one scope. Both absent → the shared `anon` scope.
pub fn identity_key(user_id: Option<&str>, email: Option<&str>) -> String {
    if let Some(id) = user_id.map(str::trim).filter(|s| !s.is_empty()) {
        return format!("u:{}", id);
    }
    if let Some(e) = email.map(str::trim).filter(|s| !s.is_empty()) {
        return format!("e:{}", e.to_lowercase());
    }
    "anon".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stable_json_sorts_keys_at_every_depth() {
        let a = json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        assert_eq!(stable_json(&a), r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#);
    }

    #[test]
    fn content_hash_is_order_independent() {
        let mut m1 = serde_json::Map::new();
        m1.insert("alpha".into(), json!(1));
        m1.insert("beta".into(), json!(2));
        let mut m2 = serde_json::Map::new();
        m2.insert("beta".into(), json!(2));
        m2.insert("alpha".into(), json!(1));
        assert_eq!(
            content_hash(&Value::Object(m1)),
            content_hash(&Value::Object(m2))
        );
    }

    #[test]
    fn hex_round_trip() {
        let h = ContentHash::from_bytes([7u8; 32]);
        assert_eq!(ContentHash::from_hex(&h.to_hex()), Ok(h));
    }

    #[test]
    fn from_hex_rejects_short_input() {
        assert!(ContentHash::from_hex("abcd").is_err());
    }

    #[test]
    fn identity_prefers_user_id_over_email() {
        assert_eq!(identity_key(Some("42"), Some("A@B.com")), "u:42");
        assert_eq!(identity_key(None, Some("  A@B.com ")), "e:a@b.com");
        assert_eq!(identity_key(None, None), "anon");
        assert_eq!(identity_key(Some("  "), Some("")), "anon");
    }
}
