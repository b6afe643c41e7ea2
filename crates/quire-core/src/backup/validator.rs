//! Structural checks on backup documents.
//!
//! These run before any signature check or decryption.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::error::{QuireError, Result};

pub const FORMAT_PLAINTEXT: &str = "plaintext";
pub const FORMAT_PASSWORD_PROTECTED: &str = "password-protected";
pub const FORMAT_ENCRYPTED: &str = "encrypted";

pub const TYPE_PROTECTED_NOTE: &str = "protected-note";
pub const TYPE_SINGLE_NOTE: &str = "single-note";

const KNOWN_FORMATS: [&str; 3] = [FORMAT_PASSWORD_PROTECTED, FORMAT_ENCRYPTED, FORMAT_PLAINTEXT];
const KNOWN_TYPES: [&str; 2] = [TYPE_PROTECTED_NOTE, TYPE_SINGLE_NOTE];

/// Shape expected of a decrypted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptedKind {
    SingleNote,
    Bulk,
}

fn invalid(message: impl Into<String>) -> QuireError {
    QuireError::InvalidBackup(message.into())
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn check_note(note: &Value, label: &str) -> Result<()> {
    if !note.is_object() {
        return Err(invalid(format!("{} is not an object", label)));
    }
    if non_empty_str(note, "id").is_none() {
        return Err(invalid(format!("{} missing or invalid id", label)));
    }
    if !note.get("content").is_some_and(Value::is_string) {
        return Err(invalid(format!("{} missing or invalid content", label)));
    }
    Ok(())
}

fn check_notes_array(value: &Value, prefix: &str) -> Result<()> {
    let notes = value
        .get("notes")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(format!("{} missing notes array", prefix)))?;
    for (i, note) in notes.iter().enumerate() {
        check_note(note, &format!("note at index {}", i))?;
    }
    Ok(())
}

fn check_base64(value: &Value, field: &str) -> Result<()> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) => STANDARD
            .decode(s)
            .map(|_| ())
            .map_err(|_| invalid(format!("{} is not valid base64", field))),
        Some(_) => Err(invalid(format!("{} must be a string", field))),
    }
}

/// Validate the outer structure of a backup document.
///
/// Checks, in order: object, `version`, RFC 3339 `exportedAt`, a known
/// `format` or `type`, `encryptedData` for protected backups, the `notes`
/// array for plaintext ones, and base64 `salt`/`hmac` when present.
pub fn validate_structure(backup: &Value) -> Result<()> {
    if !backup.is_object() {
        return Err(invalid("must be a JSON object"));
    }
    if non_empty_str(backup, "version").is_none() {
        return Err(invalid("missing or invalid version"));
    }

    let exported_at = non_empty_str(backup, "exportedAt")
        .ok_or_else(|| invalid("missing or invalid exportedAt timestamp"))?;
    chrono::DateTime::parse_from_rfc3339(exported_at)
        .map_err(|_| invalid("exportedAt is not a valid date"))?;

    let format = non_empty_str(backup, "format");
    let kind = non_empty_str(backup, "type");
    if format.is_none() && kind.is_none() {
        return Err(invalid("missing format or type field"));
    }
    if let Some(format) = format {
        if !KNOWN_FORMATS.contains(&format) {
            return Err(invalid(format!("unknown format \"{}\"", format)));
        }
    }
    if let Some(kind) = kind {
        if !KNOWN_TYPES.contains(&kind) {
            return Err(invalid(format!("unknown type \"{}\"", kind)));
        }
    }

    if format == Some(FORMAT_PASSWORD_PROTECTED) || kind == Some(TYPE_PROTECTED_NOTE) {
        let data = backup
            .get("encryptedData")
            .filter(|d| d.is_object())
            .ok_or_else(|| invalid("password-protected backup missing encryptedData"))?;
        if non_empty_str(data, "ciphertext").is_none() {
            return Err(invalid("encryptedData missing ciphertext"));
        }
        if non_empty_str(data, "nonce").is_none() {
            return Err(invalid("encryptedData missing nonce"));
        }
    }

    if format == Some(FORMAT_PLAINTEXT) {
        check_notes_array(backup, "plaintext backup")?;
    }

    check_base64(backup, "salt")?;
    check_base64(backup, "hmac")?;
    Ok(())
}

/// Validate a payload after decryption.
///
/// With `expected = None` the shape is inferred from the payload itself.
pub fn validate_decrypted(payload: &Value, expected: Option<DecryptedKind>) -> Result<()> {
    if !payload.is_object() {
        return Err(invalid("decrypted data must be an object"));
    }

    let single = payload.get("type").and_then(Value::as_str) == Some(TYPE_SINGLE_NOTE)
        || expected == Some(DecryptedKind::SingleNote);
    if single {
        let note = payload
            .get("note")
            .ok_or_else(|| invalid("decrypted data missing note object"))?;
        return check_note(note, "decrypted note");
    }

    if payload.get("notes").is_some() || expected == Some(DecryptedKind::Bulk) {
        return check_notes_array(payload, "decrypted data");
    }

    Err(invalid("decrypted data has unknown format"))
}
