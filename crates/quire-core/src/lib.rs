//! # Quire Core
//!
//! Encrypted local persistence engine for Quire, a local-first note store.
//!
//! This crate provides the storage, key management and backup logic
//! independent of the CLI interface.
//!
//! ## Architecture
//!
//! - **crypto**: primitives, key derivation, envelope encryption, passphrases
//! - **secure_store**: separate key-value database for salts and counters
//! - **metadata**: HMAC hashes of searchable fields
//! - **records**: note rows, migration of legacy rows, verified delete
//! - **rate_limit**: failed unlock counter and lockout
//! - **backup**: structural validation, signing, export/import
//! - **session**: master key lifecycle and idle auto-lock
//! - **context**: wiring of the above for one data directory

pub mod backup;
pub mod context;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod metadata;
pub mod note;
pub mod rate_limit;
pub mod records;
pub mod secure_store;
pub mod session;

mod sqlite;

pub use context::{CoreOptions, StorageContext};
pub use error::{QuireError, Result};
pub use note::{Note, NoteMode};
pub use records::{MaintenanceReport, RecordStore};
pub use session::{AutoLock, Session};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
