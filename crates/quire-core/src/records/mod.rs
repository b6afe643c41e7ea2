//! Record store and migration layer.
//!
//! Every note is stored as one row whose payload is sealed under the device
//! key. When a master key is available the note body is additionally
//! encrypted under its note key before sealing, so a stolen `notes.db`
//! without the passphrase reveals neither titles nor content.
//!
//! Rows written by older versions hold plaintext JSON. They are migrated the
//! first time they are read, or in bulk by [`RecordStore::cleanup_and_migrate`].

mod row;
mod sqlite_backend;
mod traits;

use std::sync::Arc;

pub use row::{EncryptedRow, RecordRow, StoredRecord};
pub use sqlite_backend::SqliteRecordBackend;
pub use traits::{RecordBackend, RetryPolicy, Sleeper, TokioSleeper};

use crate::crypto::{decrypt_note, encrypt_note, open_json, seal_json, DeviceKey, MasterKey};
use crate::error::{QuireError, Result};
use crate::metadata;
use crate::note::{extract_title, Note};

/// Outcome of a maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub migrated: usize,
    pub cleaned: usize,
}

/// Note persistence on top of a [`RecordBackend`].
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
    sleeper: Arc<dyn Sleeper>,
    device_key: DeviceKey,
    retry: RetryPolicy,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn RecordBackend>, device_key: DeviceKey) -> Self {
        Self {
            backend,
            sleeper: Arc::new(TokioSleeper),
            device_key,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Persist a note.
    ///
    /// With a master key the content is encrypted under the note key and
    /// blanked in the payload. Without one the note is stored with
    /// `encrypted = false`, except that a note whose body is still held only
    /// in its existing envelope keeps that envelope untouched, along with the
    /// stored content length.
    pub async fn save(&self, note: &Note, master: Option<&MasterKey>) -> Result<()> {
        if note.id.trim().is_empty() {
            return Err(QuireError::InvalidInput(
                "Note id cannot be empty".to_string(),
            ));
        }

        let mut payload = note.clone();
        payload.title = extract_title(&note.title, &note.content);
        let mut content_length = note.content.chars().count() as i64;

        match master {
            Some(master) if !note.content.is_empty() => {
                let envelope = encrypt_note(&note.content, &note.id, master)?;
                payload.encrypted = true;
                payload.content = String::new();
                payload.ciphertext = Some(envelope.ciphertext);
                payload.nonce = Some(envelope.nonce);
            }
            _ if note.content.is_empty() && note.note_envelope().is_some() => {
                if let Some(previous) = self.backend.get(&note.id).await? {
                    content_length = previous.content_length;
                }
            }
            _ => {
                payload.encrypted = false;
                payload.ciphertext = None;
                payload.nonce = None;
            }
        }

        self.write(&payload, content_length).await
    }

    async fn write(&self, payload: &Note, content_length: i64) -> Result<()> {
        let key = self.device_key.key();
        let row = EncryptedRow {
            id: payload.id.clone(),
            envelope: seal_json(payload, key)?,
            title_hash: metadata::hash_term(&payload.title, key)?,
            tag_hashes: metadata::hash_terms(&payload.tags, key)?,
            content_length,
            updated: payload.updated.to_rfc3339(),
        };
        self.backend.put(row).await
    }

    /// Re-save a legacy note in the sealed format, keeping its fields.
    async fn migrate(&self, note: &Note) -> Result<()> {
        tracing::debug!(note_id = %note.id, "migrating legacy note to encrypted format");
        let mut legacy = note.clone();
        legacy.encrypted = false;
        legacy.ciphertext = None;
        legacy.nonce = None;
        let content_length = legacy.content.chars().count() as i64;
        self.write(&legacy, content_length).await
    }

    fn open_row(&self, row: &EncryptedRow) -> Result<Note> {
        open_json(&row.envelope, self.device_key.key())
    }

    /// Note metadata with the note-layer envelope still sealed.
    ///
    /// Legacy rows are migrated on the way out. Corrupt or undecryptable rows
    /// read as `None`.
    pub async fn get_note_metadata(&self, id: &str) -> Result<Option<Note>> {
        let Some(row) = self.backend.get(id).await? else {
            return Ok(None);
        };

        match StoredRecord::from(row) {
            StoredRecord::Encrypted(row) => match self.open_row(&row) {
                Ok(note) => Ok(Some(note)),
                Err(e) => {
                    tracing::warn!(note_id = %id, error = %e, "failed to decrypt note record");
                    Ok(None)
                }
            },
            StoredRecord::Legacy(note) => {
                if let Err(e) = self.migrate(&note).await {
                    tracing::error!(note_id = %id, error = %e, "failed to migrate legacy note");
                }
                Ok(Some(note))
            }
            StoredRecord::Corrupt { reason, .. } => {
                tracing::warn!(note_id = %id, reason = %reason, "invalid note record");
                Ok(None)
            }
        }
    }

    /// Load a note with its content decrypted.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no readable note has this id
    /// - `Locked` if the note body is encrypted and no master key was given
    /// - `DecryptionFailed` if the note envelope does not open
    pub async fn load(&self, id: &str, master: Option<&MasterKey>) -> Result<Note> {
        let mut note = self
            .get_note_metadata(id)
            .await?
            .ok_or_else(|| QuireError::NotFound(format!("Note {}", id)))?;

        match note.note_envelope() {
            Some(envelope) => {
                let master = master.ok_or(QuireError::Locked)?;
                note.content = decrypt_note(&envelope, &note.id, master)?;
            }
            None if note.encrypted => {
                tracing::warn!(
                    note_id = %id,
                    "note marked encrypted without ciphertext, treating as plaintext"
                );
                note.encrypted = false;
            }
            None => {}
        }
        Ok(note)
    }

    /// Every readable note, newest first.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let rows = self.backend.all().await?;
        let mut notes = Vec::with_capacity(rows.len());

        for row in rows {
            match StoredRecord::from(row) {
                StoredRecord::Encrypted(row) => match self.open_row(&row) {
                    Ok(note) => notes.push(note),
                    Err(e) => {
                        tracing::warn!(note_id = %row.id, error = %e, "skipping undecryptable note")
                    }
                },
                StoredRecord::Legacy(note) => {
                    if let Err(e) = self.migrate(&note).await {
                        tracing::error!(note_id = %note.id, error = %e, "failed to migrate legacy note");
                    }
                    notes.push(note);
                }
                StoredRecord::Corrupt { id, reason } => {
                    tracing::warn!(note_id = %id, reason = %reason, "skipping invalid note record")
                }
            }
        }

        notes.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(notes)
    }

    /// Notes whose title or one of whose tags equals `query` (case-insensitive).
    pub async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let key = self.device_key.key();
        let query_hash = metadata::hash_term(query, key)?;
        if query_hash.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.backend.all().await?;
        let mut results = Vec::new();
        for row in rows {
            match StoredRecord::from(row) {
                StoredRecord::Encrypted(row) => {
                    let hit = row.title_hash == query_hash
                        || row.tag_hashes.iter().any(|h| *h == query_hash);
                    if !hit {
                        continue;
                    }
                    match self.open_row(&row) {
                        Ok(note) => results.push(note),
                        Err(e) => {
                            tracing::warn!(note_id = %row.id, error = %e, "skipping undecryptable note")
                        }
                    }
                }
                StoredRecord::Legacy(note) => {
                    let title = extract_title(&note.title, &note.content);
                    let mut hashes = metadata::hash_terms(&note.tags, key)?;
                    hashes.push(metadata::hash_term(&title, key)?);
                    if hashes.iter().any(|h| *h == query_hash) {
                        if let Err(e) = self.migrate(&note).await {
                            tracing::error!(note_id = %note.id, error = %e, "failed to migrate legacy note");
                        }
                        results.push(note);
                    }
                }
                StoredRecord::Corrupt { .. } => {}
            }
        }

        results.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(results)
    }

    /// Delete a note and verify it is gone, retrying per the store's policy.
    ///
    /// # Errors
    ///
    /// Returns `DeleteFailed` if the row can still be read after the last
    /// attempt, or the backend error from the last attempt.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let outcome = match self.backend.remove(id).await {
                Ok(()) => self.backend.get(id).await.map(|row| row.is_none()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(true) => {
                    tracing::debug!(note_id = %id, attempt, "note deleted");
                    return Ok(());
                }
                Ok(false) => {
                    tracing::warn!(note_id = %id, attempt, "note still present after delete");
                }
                Err(e) if attempt == max_attempts => {
                    tracing::error!(note_id = %id, attempt, error = %e, "delete failed");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(note_id = %id, attempt, error = %e, "delete attempt failed");
                }
            }

            if attempt < max_attempts {
                self.sleeper.sleep(self.retry.backoff_after(attempt)).await;
            }
        }

        tracing::error!(note_id = %id, attempts = max_attempts, "note still exists after delete retries");
        Err(QuireError::DeleteFailed {
            id: id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Migrate every legacy row and remove rows with neither content nor an
    /// envelope. Per-row failures are logged and skipped.
    pub async fn cleanup_and_migrate(&self) -> Result<MaintenanceReport> {
        tracing::info!("starting record cleanup and migration");
        let mut report = MaintenanceReport::default();

        for row in self.backend.all().await? {
            match StoredRecord::from(row) {
                StoredRecord::Legacy(note) => match self.migrate(&note).await {
                    Ok(()) => report.migrated += 1,
                    Err(e) => {
                        tracing::error!(note_id = %note.id, error = %e, "failed to migrate legacy note")
                    }
                },
                StoredRecord::Corrupt { id, reason } => {
                    tracing::debug!(note_id = %id, reason = %reason, "removing corrupted note");
                    match self.backend.remove(&id).await {
                        Ok(()) => report.cleaned += 1,
                        Err(e) => {
                            tracing::error!(note_id = %id, error = %e, "failed to remove corrupted note")
                        }
                    }
                }
                StoredRecord::Encrypted(_) => {}
            }
        }

        tracing::info!(
            migrated = report.migrated,
            cleaned = report.cleaned,
            "cleanup complete"
        );
        Ok(report)
    }
}
