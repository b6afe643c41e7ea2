//! Building and reading signed backup files.
//!
//! Plaintext backups are signed with a MAC key derived from the device key,
//! so they only verify on the installation that wrote them. Protected
//! backups derive one key from the export password and a fresh salt, then
//! split it with HKDF into an encryption key and a MAC key.

use secrecy::SecretString;
use serde_json::{json, Value};

use super::integrity::{sign, verify, DEFAULT_VERSION};
use super::validator::{
    validate_decrypted, validate_structure, DecryptedKind, FORMAT_ENCRYPTED,
    FORMAT_PASSWORD_PROTECTED, FORMAT_PLAINTEXT, TYPE_PROTECTED_NOTE, TYPE_SINGLE_NOTE,
};
use crate::crypto::primitives::hkdf_sha256;
use crate::crypto::{derive_key, open_json, seal_json, DeviceKey, Envelope, KdfParams, Salt, SymmetricKey};
use crate::error::{QuireError, Result};
use crate::note::Note;

const BACKUP_CONTEXT: &[u8] = b"quire/backup/v1";

/// Keys available to an import.
pub struct ImportKeys<'a> {
    pub device_key: &'a DeviceKey,
    pub password: Option<&'a SecretString>,
    pub params: KdfParams,
}

struct ProtectedKeys {
    encryption: SymmetricKey,
    mac: SymmetricKey,
}

fn subkey(base: &SymmetricKey, info: &[u8]) -> Result<SymmetricKey> {
    Ok(SymmetricKey::from_bytes(hkdf_sha256(
        base.as_bytes(),
        BACKUP_CONTEXT,
        info,
    )?))
}

fn device_mac_key(device_key: &DeviceKey) -> Result<SymmetricKey> {
    subkey(device_key.key(), b"device-mac")
}

async fn protected_keys(password: &SecretString, salt: &Salt, params: KdfParams) -> Result<ProtectedKeys> {
    let base = derive_key(password, salt, params).await?;
    Ok(ProtectedKeys {
        encryption: subkey(&base, b"encryption")?,
        mac: subkey(&base, b"mac")?,
    })
}

fn exported_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn to_pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Signed plaintext backup of `notes`.
pub fn export_plaintext(notes: &[Note], device_key: &DeviceKey) -> Result<String> {
    let document = json!({
        "version": DEFAULT_VERSION,
        "exportedAt": exported_at(),
        "format": FORMAT_PLAINTEXT,
        "notes": serde_json::to_value(notes)?,
    });
    to_pretty(&sign(&document, &device_mac_key(device_key)?)?)
}

/// Encrypted, signed backup of `notes` under an export password.
pub async fn export_protected(notes: &[Note], password: &SecretString, params: KdfParams) -> Result<String> {
    let salt = Salt::generate()?;
    let keys = protected_keys(password, &salt, params).await?;
    let envelope = seal_json(&json!({ "notes": serde_json::to_value(notes)? }), &keys.encryption)?;
    let document = json!({
        "version": DEFAULT_VERSION,
        "exportedAt": exported_at(),
        "format": FORMAT_PASSWORD_PROTECTED,
        "encryptedData": serde_json::to_value(envelope)?,
        "salt": salt.as_str(),
    });
    to_pretty(&sign(&document, &keys.mac)?)
}

/// Encrypted, signed export of a single note.
pub async fn export_protected_note(note: &Note, password: &SecretString, params: KdfParams) -> Result<String> {
    let salt = Salt::generate()?;
    let keys = protected_keys(password, &salt, params).await?;
    let envelope = seal_json(
        &json!({ "type": TYPE_SINGLE_NOTE, "note": serde_json::to_value(note)? }),
        &keys.encryption,
    )?;
    let document = json!({
        "version": DEFAULT_VERSION,
        "exportedAt": exported_at(),
        "type": TYPE_PROTECTED_NOTE,
        "encryptedData": serde_json::to_value(envelope)?,
        "salt": salt.as_str(),
    });
    to_pretty(&sign(&document, &keys.mac)?)
}

fn parse_notes(values: &Value) -> Result<Vec<Note>> {
    serde_json::from_value(values.clone())
        .map_err(|e| QuireError::InvalidBackup(format!("Notes could not be read: {}", e)))
}

/// Read a backup and return its notes.
///
/// Order of checks: JSON parse, structure, signature, decryption, decrypted
/// structure. Nothing is returned unless every step passes.
pub async fn import(json: &str, keys: ImportKeys<'_>) -> Result<Vec<Note>> {
    let document: Value = serde_json::from_str(json)
        .map_err(|e| QuireError::InvalidBackup(format!("Not valid JSON: {}", e)))?;
    validate_structure(&document)?;

    let format = document.get("format").and_then(Value::as_str);
    let kind = document.get("type").and_then(Value::as_str);

    if format == Some(FORMAT_PLAINTEXT) {
        verify(&document, &device_mac_key(keys.device_key)?).into_result()?;
        return parse_notes(&document["notes"]);
    }

    if format == Some(FORMAT_PASSWORD_PROTECTED) || kind == Some(TYPE_PROTECTED_NOTE) {
        let password = keys.password.ok_or_else(|| {
            QuireError::InvalidInput("This backup is password protected".to_string())
        })?;
        let salt = document
            .get("salt")
            .and_then(Value::as_str)
            .ok_or_else(|| QuireError::InvalidBackup("Protected backup missing salt".to_string()))
            .and_then(|s| {
                Salt::parse(s).map_err(|e| QuireError::InvalidBackup(e.to_string()))
            })?;
        let derived = protected_keys(password, &salt, keys.params).await?;

        verify(&document, &derived.mac).into_result()?;

        let envelope: Envelope = serde_json::from_value(document["encryptedData"].clone())
            .map_err(|e| QuireError::InvalidBackup(format!("Invalid encryptedData: {}", e)))?;
        let payload: Value = open_json(&envelope, &derived.encryption).map_err(|e| {
            QuireError::InvalidBackup(format!("Backup could not be decrypted: {}", e))
        })?;

        let expected = if kind == Some(TYPE_PROTECTED_NOTE) {
            DecryptedKind::SingleNote
        } else {
            DecryptedKind::Bulk
        };
        validate_decrypted(&payload, Some(expected))?;

        return match expected {
            DecryptedKind::SingleNote => {
                let note: Note = serde_json::from_value(payload["note"].clone()).map_err(|e| {
                    QuireError::InvalidBackup(format!("Note could not be read: {}", e))
                })?;
                Ok(vec![note])
            }
            DecryptedKind::Bulk => parse_notes(&payload["notes"]),
        };
    }

    let label = format.or(kind).unwrap_or(FORMAT_ENCRYPTED);
    Err(QuireError::InvalidBackup(format!(
        "Backup format \"{}\" cannot be imported",
        label
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: KdfParams = KdfParams::insecure_for_tests();

    fn device_key(byte: u8) -> DeviceKey {
        DeviceKey::new(SymmetricKey::from_bytes([byte; 32]))
    }

    fn notes() -> Vec<Note> {
        vec![
            Note::new("One", "first body").with_tags(&["a"]),
            Note::new("Two", "second body"),
        ]
    }

    fn keys<'a>(device: &'a DeviceKey, password: Option<&'a SecretString>) -> ImportKeys<'a> {
        ImportKeys {
            device_key: device,
            password,
            params: PARAMS,
        }
    }

    #[tokio::test]
    async fn test_plaintext_round_trip() {
        let device = device_key(1);
        let original = notes();
        let json = export_plaintext(&original, &device).unwrap();
        let imported = import(&json, keys(&device, None)).await.unwrap();
        assert_eq!(imported, original);
    }

    #[tokio::test]
    async fn test_plaintext_from_other_device_is_rejected() {
        let json = export_plaintext(&notes(), &device_key(1)).unwrap();
        let other = device_key(2);
        let err = import(&json, keys(&other, None)).await.unwrap_err();
        assert!(matches!(err, QuireError::InvalidBackup(_)));
    }

    #[tokio::test]
    async fn test_protected_round_trip() {
        let password = SecretString::from("export-password".to_string());
        let original = notes();
        let json = export_protected(&original, &password, PARAMS).await.unwrap();
        assert!(!json.contains("first body"));

        let device = device_key(3);
        let imported = import(&json, keys(&device, Some(&password))).await.unwrap();
        assert_eq!(imported, original);
    }

    #[tokio::test]
    async fn test_protected_wrong_password_is_invalid() {
        let json = export_protected(&notes(), &SecretString::from("right-password".to_string()), PARAMS)
            .await
            .unwrap();
        let wrong = SecretString::from("wrong-password".to_string());
        let device = device_key(3);
        let err = import(&json, keys(&device, Some(&wrong))).await.unwrap_err();
        assert!(matches!(err, QuireError::InvalidBackup(_)));
    }

    #[tokio::test]
    async fn test_protected_requires_password() {
        let json = export_protected(&notes(), &SecretString::from("pw-123456".to_string()), PARAMS)
            .await
            .unwrap();
        let device = device_key(3);
        assert!(matches!(
            import(&json, keys(&device, None)).await,
            Err(QuireError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_single_note_round_trip() {
        let password = SecretString::from("note-password".to_string());
        let note = Note::new("Solo", "only me");
        let json = export_protected_note(&note, &password, PARAMS).await.unwrap();
        let device = device_key(4);
        let imported = import(&json, keys(&device, Some(&password))).await.unwrap();
        assert_eq!(imported, vec![note]);
    }

    #[tokio::test]
    async fn test_malformed_structure_rejected_before_verification() {
        let device = device_key(1);
        let err = import(r#"{"version":"1.0","format":"plaintext"}"#, keys(&device, None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exportedAt"));

        let err = import("not json", keys(&device, None)).await.unwrap_err();
        assert!(matches!(err, QuireError::InvalidBackup(_)));
    }

    #[tokio::test]
    async fn test_unsigned_backup_rejected() {
        let device = device_key(1);
        let json = serde_json::json!({
            "version": "1.0",
            "exportedAt": "2024-05-01T12:00:00Z",
            "format": "plaintext",
            "notes": [],
        })
        .to_string();
        let err = import(&json, keys(&device, None)).await.unwrap_err();
        assert!(err.to_string().contains("missing integrity signature"));
    }
}
