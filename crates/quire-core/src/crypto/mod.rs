//! Cryptographic operations for Quire.
//!
//! This module wraps audited RustCrypto primitives and builds the key
//! hierarchy on top of them:
//! - **XChaCha20-Poly1305**: authenticated encryption, 24-byte random nonces
//! - **PBKDF2-HMAC-SHA256**: password and device secret stretching
//! - **HKDF-SHA256**: per-note keys and backup sub-keys
//! - **HMAC-SHA256**: searchable metadata hashes and backup signatures
//!
//! ## Key hierarchy
//!
//! - Master key: derived from the user's passphrase, memory only
//! - Device key: derived from a random per-installation identifier
//! - Note key: derived from (master key, note id)
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the note or secure databases
//! - Offline brute-force attacks on the passphrase
//! - Tampering with exported backups
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Access to an unlocked session / process memory

pub mod engine;
pub mod kdf;
pub mod key;
pub mod passphrase;
pub mod primitives;

pub use engine::{
    decrypt, decrypt_note, derive_note_key, encrypt, encrypt_note, open_json, seal_json, Envelope,
};
pub use kdf::{derive_key, derive_key_blocking, generate_device_id, KdfParams};
pub use key::{DeviceKey, MasterKey, Salt, SymmetricKey};
pub use passphrase::{check_strength, validate_passphrase, PassphraseStrength, StrengthLevel};
