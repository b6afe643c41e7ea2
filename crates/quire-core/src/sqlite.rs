//! Shared SQLite handle used by the record store and the secure store.
//!
//! Each database gets one connection behind a mutex. Every round trip runs on
//! the blocking pool so async callers never stall the runtime on disk I/O.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{QuireError, Result};

/// How long SQLite waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub(crate) struct SqliteHandle {
    conn: Arc<Mutex<Connection>>,
    label: &'static str,
}

impl SqliteHandle {
    /// Open (creating if needed) a database file and apply its schema.
    pub(crate) async fn open(path: &Path, schema: &'static str, label: &'static str) -> Result<Self> {
        let path = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    QuireError::StorageUnavailable(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            let conn = Connection::open(&path).map_err(|e| {
                QuireError::StorageUnavailable(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                ))
            })?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(schema)?;
            crate::fs::restrict_permissions(&path)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            label,
        })
    }

    /// Open a private in-memory database (tests and dry runs).
    pub(crate) fn open_in_memory(schema: &str, label: &'static str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            label,
        })
    }

    /// Run `f` against the connection on the blocking pool.
    pub(crate) async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let label = self.label;
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn, label)?;
            f(&mut guard)
        })
        .await?
    }
}

/// Lock the connection, returning an error if the mutex is poisoned.
fn lock<'a>(conn: &'a Mutex<Connection>, label: &str) -> Result<MutexGuard<'a, Connection>> {
    conn.lock()
        .map_err(|_| QuireError::StorageUnavailable(format!("{} connection poisoned", label)))
}
