//! Privacy-preserving hashes for searchable note fields.
//!
//! Titles and tags are never stored in plaintext. Instead the record store
//! keeps an HMAC of each normalized term, keyed by the device key. A query is
//! hashed the same way and compared for equality, so search works on exact
//! tokens only: substring search, reversal and cross-device correlation are
//! all impossible by construction.

use crate::crypto::primitives::hmac_sha256;
use crate::crypto::SymmetricKey;
use crate::error::Result;

/// Normalize a title, tag or query before hashing.
pub fn normalize_term(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Hex-encoded HMAC-SHA256 of `value` under `key`.
///
/// An empty value hashes to the empty string so "no title" never collides
/// with a real term.
pub fn hash(value: &str, key: &SymmetricKey) -> Result<String> {
    if value.is_empty() {
        return Ok(String::new());
    }
    Ok(hex::encode(hmac_sha256(key.as_bytes(), value.as_bytes())?))
}

/// Hash each value, dropping empties.
pub fn hash_many<S: AsRef<str>>(values: &[S], key: &SymmetricKey) -> Result<Vec<String>> {
    let mut hashes = Vec::with_capacity(values.len());
    for value in values {
        let digest = hash(value.as_ref(), key)?;
        if !digest.is_empty() {
            hashes.push(digest);
        }
    }
    Ok(hashes)
}

/// Hash a normalized term.
pub fn hash_term(value: &str, key: &SymmetricKey) -> Result<String> {
    hash(&normalize_term(value), key)
}

/// Hash normalized terms, dropping empties.
pub fn hash_terms<S: AsRef<str>>(values: &[S], key: &SymmetricKey) -> Result<Vec<String>> {
    let normalized: Vec<String> = values.iter().map(|v| normalize_term(v.as_ref())).collect();
    hash_many(&normalized, key)
}

/// Whether `query` matches any of the stored hashes.
pub fn matches(query: &str, hashes: &[&str], key: &SymmetricKey) -> Result<bool> {
    let query_hash = hash_term(query, key)?;
    if query_hash.is_empty() {
        return Ok(false);
    }
    Ok(hashes.iter().any(|stored| *stored == query_hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_hash_is_deterministic_hex() {
        let a = hash("groceries", &key(1)).unwrap();
        let b = hash("groceries", &key(1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_depends_on_key_and_value() {
        assert_ne!(hash("groceries", &key(1)).unwrap(), hash("groceries", &key(2)).unwrap());
        assert_ne!(hash("groceries", &key(1)).unwrap(), hash("grocery", &key(1)).unwrap());
    }

    #[test]
    fn test_empty_value_hashes_to_empty() {
        assert_eq!(hash("", &key(1)).unwrap(), "");
        let hashes = hash_many(&["work", "", "home"], &key(1)).unwrap();
        assert_eq!(hashes.len(), 2);
    }

    #[test]
    fn test_matches_exact_token_only() {
        let k = key(4);
        let stored = hash_term("Shopping List", &k).unwrap();
        assert!(matches("shopping list", &[stored.as_str()], &k).unwrap());
        assert!(matches("  SHOPPING LIST ", &[stored.as_str()], &k).unwrap());
        assert!(!matches("shopping", &[stored.as_str()], &k).unwrap());
        assert!(!matches("", &[stored.as_str()], &k).unwrap());
    }

    #[test]
    fn test_hash_terms_normalizes() {
        let k = key(4);
        assert_eq!(
            hash_terms(&["Work"], &k).unwrap(),
            vec![hash("work", &k).unwrap()]
        );
    }
}
