//! Note row type for database queries.

use crate::crypto::Envelope;
use crate::note::Note;

/// Raw row data from the notes table, before it is classified.
#[derive(Debug, Clone, Default)]
pub struct RecordRow {
    pub id: String,
    pub encrypted_data: Option<String>,
    pub encrypted: bool,
    pub title_hash: Option<String>,
    pub tags_hash: Option<String>,
    pub content_length: i64,
    pub updated: Option<String>,
    pub legacy_json: Option<String>,
}

/// Row to be written in the current (device-key sealed) format.
#[derive(Debug, Clone)]
pub struct EncryptedRow {
    pub id: String,
    pub envelope: Envelope,
    pub title_hash: String,
    pub tag_hashes: Vec<String>,
    pub content_length: i64,
    pub updated: String,
}

/// A row resolved once at load.
#[derive(Debug, Clone)]
pub enum StoredRecord {
    /// Plaintext note from before storage encryption.
    Legacy(Note),
    /// Payload sealed under the device key.
    Encrypted(EncryptedRow),
    /// Neither readable content nor an envelope.
    Corrupt { id: String, reason: String },
}

impl StoredRecord {
    pub fn id(&self) -> &str {
        match self {
            StoredRecord::Legacy(note) => &note.id,
            StoredRecord::Encrypted(row) => &row.id,
            StoredRecord::Corrupt { id, .. } => id,
        }
    }
}

impl From<RecordRow> for StoredRecord {
    fn from(row: RecordRow) -> Self {
        if row.encrypted {
            if let Some(data) = row.encrypted_data.as_deref() {
                return match serde_json::from_str::<Envelope>(data) {
                    Ok(envelope) => {
                        let tag_hashes = row
                            .tags_hash
                            .as_deref()
                            .and_then(|json| serde_json::from_str(json).ok())
                            .unwrap_or_default();
                        StoredRecord::Encrypted(EncryptedRow {
                            id: row.id,
                            envelope,
                            title_hash: row.title_hash.unwrap_or_default(),
                            tag_hashes,
                            content_length: row.content_length,
                            updated: row.updated.unwrap_or_default(),
                        })
                    }
                    Err(e) => StoredRecord::Corrupt {
                        id: row.id,
                        reason: format!("Invalid envelope JSON: {}", e),
                    },
                };
            }
        }

        let Some(json) = row.legacy_json.as_deref() else {
            return StoredRecord::Corrupt {
                id: row.id,
                reason: "Row has no content and no envelope".to_string(),
            };
        };

        let mut value: serde_json::Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                return StoredRecord::Corrupt {
                    id: row.id,
                    reason: format!("Invalid legacy JSON: {}", e),
                }
            }
        };

        let has_content = value
            .get("content")
            .and_then(|c| c.as_str())
            .is_some_and(|c| !c.is_empty());
        if !has_content {
            return StoredRecord::Corrupt {
                id: row.id,
                reason: "Legacy row has no content".to_string(),
            };
        }

        if let Some(object) = value.as_object_mut() {
            object.insert("id".to_string(), serde_json::Value::String(row.id.clone()));
            // Legacy rows predate note-layer encryption.
            object.insert("encrypted".to_string(), serde_json::Value::Bool(false));
        }

        match serde_json::from_value::<Note>(value) {
            Ok(note) => StoredRecord::Legacy(note),
            Err(e) => StoredRecord::Corrupt {
                id: row.id,
                reason: format!("Legacy row does not describe a note: {}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> RecordRow {
        RecordRow {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_encrypted_row_resolves() {
        let mut r = row("n1");
        r.encrypted = true;
        r.encrypted_data = Some(r#"{"ciphertext":"YQ==","nonce":"Yg=="}"#.to_string());
        r.tags_hash = Some(r#"["aa","bb"]"#.to_string());
        match StoredRecord::from(r) {
            StoredRecord::Encrypted(enc) => {
                assert_eq!(enc.id, "n1");
                assert_eq!(enc.tag_hashes, vec!["aa", "bb"]);
            }
            other => panic!("expected encrypted, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_row_resolves_with_row_id() {
        let mut r = row("n2");
        r.legacy_json =
            Some(r#"{"title":"Old","content":"body","tags":["a"],"encrypted":true}"#.to_string());
        match StoredRecord::from(r) {
            StoredRecord::Legacy(note) => {
                assert_eq!(note.id, "n2");
                assert_eq!(note.content, "body");
                assert!(!note.encrypted);
            }
            other => panic!("expected legacy, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_row_is_corrupt() {
        assert!(matches!(
            StoredRecord::from(row("n3")),
            StoredRecord::Corrupt { .. }
        ));
    }

    #[test]
    fn test_legacy_without_content_is_corrupt() {
        let mut r = row("n4");
        r.legacy_json = Some(r#"{"title":"Only a title","content":""}"#.to_string());
        assert!(matches!(StoredRecord::from(r), StoredRecord::Corrupt { .. }));
    }

    #[test]
    fn test_garbled_envelope_is_corrupt() {
        let mut r = row("n5");
        r.encrypted = true;
        r.encrypted_data = Some("not json".to_string());
        assert!(matches!(StoredRecord::from(r), StoredRecord::Corrupt { .. }));
    }
}
