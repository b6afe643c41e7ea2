//! HMAC signing and verification of backup documents.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::crypto::primitives::{constant_time_eq, hmac_sha256};
use crate::crypto::SymmetricKey;
use crate::error::{QuireError, Result};

pub const DEFAULT_VERSION: &str = "1.0";

/// Fields excluded from the signed bytes. `signature` is the older name.
const SIGNATURE_FIELDS: [&str; 2] = ["hmac", "signature"];

const MISSING_SIGNATURE: &str =
    "Backup file missing integrity signature (HMAC). File may be corrupted or from an older version.";
const BAD_SIGNATURE: &str =
    "Backup file integrity check failed. File may have been tampered with or corrupted.";

/// Outcome of [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub error: Option<String>,
}

impl Verification {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            valid: false,
            error: Some(message.to_string()),
        }
    }

    /// Convert into `Err(InvalidBackup)` when invalid.
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(QuireError::InvalidBackup(
                self.error.unwrap_or_else(|| BAD_SIGNATURE.to_string()),
            ))
        }
    }
}

/// Recursively sort object keys so the serialized form is stable.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn unsigned_fields(payload: &Map<String, Value>) -> Value {
    let mut unsigned = payload.clone();
    for field in SIGNATURE_FIELDS {
        unsigned.remove(field);
    }
    Value::Object(unsigned)
}

fn compute_hmac(unsigned: &Value, key: &SymmetricKey) -> Result<String> {
    let canonical = serde_json::to_string(&canonicalize(unsigned))?;
    Ok(STANDARD.encode(hmac_sha256(key.as_bytes(), canonical.as_bytes())?))
}

/// Sign a backup document.
///
/// Fills in `version` (default `"1.0"`) and `signedAt`, then attaches an
/// `hmac` covering every field except the signature itself.
pub fn sign(payload: &Value, key: &SymmetricKey) -> Result<Value> {
    let object = payload.as_object().ok_or_else(|| {
        QuireError::InvalidInput("Backup payload must be a JSON object".to_string())
    })?;

    let mut signed = object.clone();
    for field in SIGNATURE_FIELDS {
        signed.remove(field);
    }
    if !signed.get("version").is_some_and(Value::is_string) {
        signed.insert("version".to_string(), Value::from(DEFAULT_VERSION));
    }
    signed.insert(
        "signedAt".to_string(),
        Value::from(chrono::Utc::now().to_rfc3339()),
    );

    let hmac = compute_hmac(&Value::Object(signed.clone()), key)?;
    signed.insert("hmac".to_string(), Value::from(hmac));
    Ok(Value::Object(signed))
}

/// Check a signed backup document against `key`.
///
/// A missing signature is a failure, never a pass.
pub fn verify(payload: &Value, key: &SymmetricKey) -> Verification {
    let Some(object) = payload.as_object() else {
        return Verification::failed(MISSING_SIGNATURE);
    };
    let Some(provided) = object.get("hmac").and_then(Value::as_str).filter(|h| !h.is_empty())
    else {
        return Verification::failed(MISSING_SIGNATURE);
    };

    let expected = match compute_hmac(&unsigned_fields(object), key) {
        Ok(expected) => expected,
        Err(_) => return Verification::failed(BAD_SIGNATURE),
    };

    if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        Verification::ok()
    } else {
        Verification::failed(BAD_SIGNATURE)
    }
}
