//! Error types for Quire core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer maps these
//! to user-friendly messages.

use thiserror::Error;

/// Result type alias for Quire operations.
pub type Result<T> = std::result::Result<T, QuireError>;

/// Core error type for Quire operations.
#[derive(Debug, Error)]
pub enum QuireError {
    /// A platform crypto primitive could not run. Fatal for the operation.
    #[error("Crypto unavailable: {0}")]
    CryptoUnavailable(String),

    /// Wrong key, tampered ciphertext, or malformed nonce/ciphertext
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// The backing database could not be reached or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Unlock refused by the rate limiter
    #[error("Too many failed attempts. Try again in {minutes_left} minute(s)")]
    LockedOut { minutes_left: u64 },

    /// Password did not open the verifier marker
    #[error("Incorrect passphrase ({attempts_remaining} attempt(s) remaining)")]
    IncorrectPassphrase { attempts_remaining: u32 },

    /// Backup failed structural or signature validation
    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    /// A note could still be read back after every delete attempt
    #[error("Failed to delete note {id} after {attempts} attempt(s)")]
    DeleteFailed { id: String, attempts: u32 },

    /// An operation needed the master key while the session is locked
    #[error("Session is locked")]
    Locked,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl QuireError {
    /// Whether the error came from an authentication tag or encoding mismatch.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, QuireError::DecryptionFailed(_))
    }
}

impl From<std::io::Error> for QuireError {
    fn from(err: std::io::Error) -> Self {
        QuireError::StorageUnavailable(err.to_string())
    }
}

impl From<rusqlite::Error> for QuireError {
    fn from(err: rusqlite::Error) -> Self {
        QuireError::StorageUnavailable(format!("SQLite error: {}", err))
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(err: serde_json::Error) -> Self {
        QuireError::Validation(err.to_string())
    }
}

impl From<tokio::task::JoinError> for QuireError {
    fn from(err: tokio::task::JoinError) -> Self {
        QuireError::StorageUnavailable(format!("Background task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_out_message_includes_minutes() {
        let err = QuireError::LockedOut { minutes_left: 15 };
        assert!(err.to_string().contains("15 minute"));
    }

    #[test]
    fn test_decryption_failure_is_distinct_from_not_found() {
        assert!(QuireError::DecryptionFailed("tag".into()).is_decryption_failure());
        assert!(!QuireError::NotFound("note".into()).is_decryption_failure());
    }
}
