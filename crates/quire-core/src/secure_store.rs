//! Key-value store for secrets and counters.
//!
//! Lives in its own SQLite file (`secure.db`), separate from the note
//! database. The two bootstrap entries that the device key is derived from
//! are stored raw; once sealing is enabled every other value is written as a
//! JSON envelope under the device key. Each row records whether its value is
//! sealed, so a raw value is never mistaken for an envelope.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use rusqlite::{params, OptionalExtension};

use crate::crypto::{decrypt, encrypt, DeviceKey, Envelope, SymmetricKey};
use crate::error::{QuireError, Result};
use crate::sqlite::SqliteHandle;

/// Well-known secure store keys.
pub mod keys {
    pub const DEVICE_ID: &str = "device-id";
    pub const DEVICE_SALT: &str = "device-salt";
    pub const MASTER_KEY_SALT: &str = "master-key-salt";
    pub const MASTER_KEY_VERIFIER: &str = "master-key-verifier";
    pub const FAILED_ATTEMPTS: &str = "failed-attempts";
    pub const LOCKOUT_UNTIL: &str = "lockout-until";
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS secure_data (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    sealed INTEGER NOT NULL DEFAULT 0
);
";

/// Add the `sealed` flag to tables created before it existed.
fn ensure_sealed_column(conn: &rusqlite::Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(secure_data)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if !columns.iter().any(|name| name == "sealed") {
        conn.execute(
            "ALTER TABLE secure_data ADD COLUMN sealed INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

/// A stored value and whether it is an envelope under the device key.
struct StoredValue {
    value: String,
    sealed: bool,
}

fn is_bootstrap(key: &str) -> bool {
    key == keys::DEVICE_ID || key == keys::DEVICE_SALT
}

#[derive(Clone)]
pub struct SecureStore {
    db: SqliteHandle,
    sealing_key: Arc<OnceLock<SymmetricKey>>,
}

impl SecureStore {
    /// Open (or create) the secure database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let db = SqliteHandle::open(path, SCHEMA, "secure store").await?;
        db.call(|conn| ensure_sealed_column(conn)).await?;
        Ok(Self::with_handle(db))
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_handle(SqliteHandle::open_in_memory(
            SCHEMA,
            "secure store",
        )?))
    }

    fn with_handle(db: SqliteHandle) -> Self {
        Self {
            db,
            sealing_key: Arc::new(OnceLock::new()),
        }
    }

    /// Seal every non-bootstrap value under `device_key` from now on.
    ///
    /// The first key wins; later calls are no-ops.
    pub fn enable_sealing(&self, device_key: &DeviceKey) {
        let _ = self.sealing_key.set(device_key.key().clone());
    }

    pub fn is_sealed(&self) -> bool {
        self.sealing_key.get().is_some()
    }

    /// Read a value. `None` if the key was never set.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let owned = key.to_string();
        let stored: Option<StoredValue> = self
            .db
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT value, sealed FROM secure_data WHERE key = ?1",
                        params![owned],
                        |row| {
                            Ok(StoredValue {
                                value: row.get(0)?,
                                sealed: row.get::<_, i64>(1)? != 0,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?;

        match stored {
            Some(stored) => self.unseal(key, stored).map(Some),
            None => Ok(None),
        }
    }

    /// Write a value, replacing any previous one.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let stored = self.seal(key, value)?;
        let owned = key.to_string();
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO secure_data (key, value, timestamp, sealed) VALUES (?1, ?2, ?3, ?4)",
                    params![owned, stored.value, timestamp, stored.sealed as i64],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let owned = key.to_string();
        self.db
            .call(move |conn| {
                conn.execute("DELETE FROM secure_data WHERE key = ?1", params![owned])?;
                Ok(())
            })
            .await
    }

    /// Remove every entry, bootstrap keys included.
    pub async fn clear(&self) -> Result<()> {
        self.db
            .call(|conn| {
                conn.execute("DELETE FROM secure_data", [])?;
                Ok(())
            })
            .await
    }

    fn seal(&self, key: &str, value: &str) -> Result<StoredValue> {
        match self.sealing_key.get() {
            Some(sealing_key) if !is_bootstrap(key) && !value.is_empty() => Ok(StoredValue {
                value: serde_json::to_string(&encrypt(value, sealing_key)?)?,
                sealed: true,
            }),
            _ => Ok(StoredValue {
                value: value.to_string(),
                sealed: false,
            }),
        }
    }

    fn unseal(&self, key: &str, stored: StoredValue) -> Result<String> {
        if !stored.sealed {
            return Ok(stored.value);
        }
        let envelope: Envelope = serde_json::from_str(&stored.value).map_err(|e| {
            QuireError::Validation(format!("Corrupt sealed value '{}': {}", key, e))
        })?;
        let sealing_key = self.sealing_key.get().ok_or_else(|| {
            QuireError::CryptoUnavailable(format!(
                "Secure value '{}' is sealed but no device key is available",
                key
            ))
        })?;
        decrypt(&envelope, sealing_key)
    }
}
