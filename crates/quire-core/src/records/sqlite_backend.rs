//! SQLite implementation of [`RecordBackend`] over `notes.db`.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use super::row::{EncryptedRow, RecordRow};
use super::traits::RecordBackend;
use crate::error::Result;
use crate::sqlite::SqliteHandle;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    encrypted_data TEXT,
    encrypted INTEGER NOT NULL DEFAULT 0,
    searchable_title_hash TEXT,
    searchable_tags_hash TEXT,
    content_length INTEGER NOT NULL DEFAULT 0,
    updated TEXT,
    legacy_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated);
";

const SELECT_COLUMNS: &str = "SELECT id, encrypted_data, encrypted, searchable_title_hash, \
     searchable_tags_hash, content_length, updated, legacy_json FROM notes";

#[derive(Clone)]
pub struct SqliteRecordBackend {
    db: SqliteHandle,
}

impl SqliteRecordBackend {
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: SqliteHandle::open(path, SCHEMA, "notes").await?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: SqliteHandle::open_in_memory(SCHEMA, "notes")?,
        })
    }

    /// Write a plaintext row in the pre-encryption format.
    ///
    /// Used when importing data from older installations; the record store
    /// migrates such rows on first read.
    pub async fn insert_legacy(&self, id: &str, legacy_json: &str) -> Result<()> {
        let id = id.to_string();
        let legacy_json = legacy_json.to_string();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR REPLACE INTO notes (id, encrypted, legacy_json) VALUES (?1, 0, ?2)",
                    params![id, legacy_json],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        encrypted_data: row.get(1)?,
        encrypted: row.get::<_, i64>(2)? != 0,
        title_hash: row.get(3)?,
        tags_hash: row.get(4)?,
        content_length: row.get(5)?,
        updated: row.get(6)?,
        legacy_json: row.get(7)?,
    })
}

#[async_trait]
impl RecordBackend for SqliteRecordBackend {
    async fn put(&self, row: EncryptedRow) -> Result<()> {
        let envelope_json = serde_json::to_string(&row.envelope)?;
        let tags_json = serde_json::to_string(&row.tag_hashes)?;
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR REPLACE INTO notes (id, encrypted_data, encrypted, \
                     searchable_title_hash, searchable_tags_hash, content_length, updated, legacy_json) \
                     VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, NULL)",
                    params![
                        row.id,
                        envelope_json,
                        row.title_hash,
                        tags_json,
                        row.content_length,
                        row.updated
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<RecordRow>> {
        let id = id.to_string();
        self.db
            .call(move |conn| {
                let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
                Ok(conn.query_row(&sql, params![id], read_row).optional()?)
            })
            .await
    }

    async fn all(&self) -> Result<Vec<RecordRow>> {
        self.db
            .call(|conn| {
                let mut stmt = conn.prepare(SELECT_COLUMNS)?;
                let rows = stmt
                    .query_map([], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.db
            .call(move |conn| {
                conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
    }
}
