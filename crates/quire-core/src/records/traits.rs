//! Seams of the record store: the row backend and the retry sleeper.
//!
//! The `RecordBackend` trait keeps the store logic independent of SQLite so
//! tests can wrap or replace the database with a misbehaving one.

use std::time::Duration;

use async_trait::async_trait;

use super::row::{EncryptedRow, RecordRow};
use crate::error::Result;

/// Row-level persistence for notes.
///
/// Implementations must make every write atomic: a reader sees either the
/// previous row or the new one.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Insert or replace a row in the current format, clearing any legacy payload.
    async fn put(&self, row: EncryptedRow) -> Result<()>;

    /// Fetch one row. `Ok(None)` if absent.
    async fn get(&self, id: &str) -> Result<Option<RecordRow>>;

    /// Fetch every row.
    async fn all(&self) -> Result<Vec<RecordRow>>;

    /// Delete a row. Deleting an absent row is not an error.
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Waits between delete attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often and how patiently a delete is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Backoff after the given 1-based attempt, doubling each time.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}
