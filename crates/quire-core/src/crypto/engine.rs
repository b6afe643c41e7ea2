//! Envelope encryption.
//!
//! An [`Envelope`] is the base64 ciphertext and nonce produced by one
//! encryption call. Every call draws a fresh 24-byte nonce, so encrypting the
//! same plaintext twice under one key yields two different envelopes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::key::{MasterKey, SymmetricKey};
use super::primitives::{aead_open, aead_seal, hkdf_sha256};
use crate::error::{QuireError, Result};

/// HKDF salt separating note keys from every other derivation in the system.
const NOTE_KEY_CONTEXT: &[u8] = b"quire/note-key/v1";

/// Ciphertext and nonce pair, both base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub ciphertext: String,
    pub nonce: String,
}

/// Encrypt a UTF-8 string.
///
/// # Errors
///
/// Returns `QuireError::InvalidInput` for empty plaintext.
pub fn encrypt(plaintext: &str, key: &SymmetricKey) -> Result<Envelope> {
    if plaintext.is_empty() {
        return Err(QuireError::InvalidInput(
            "Plaintext cannot be empty".to_string(),
        ));
    }
    let (nonce, ciphertext) = aead_seal(key.as_bytes(), plaintext.as_bytes())?;
    Ok(Envelope {
        ciphertext: STANDARD.encode(ciphertext),
        nonce: STANDARD.encode(nonce),
    })
}

/// Decrypt an envelope back to its UTF-8 plaintext.
///
/// # Errors
///
/// Returns `QuireError::DecryptionFailed` if:
/// - The key is wrong or the ciphertext was modified
/// - The ciphertext or nonce is not valid base64
/// - The nonce has the wrong length
pub fn decrypt(envelope: &Envelope, key: &SymmetricKey) -> Result<String> {
    if envelope.ciphertext.is_empty() || envelope.nonce.is_empty() {
        return Err(QuireError::DecryptionFailed(
            "Envelope is missing ciphertext or nonce".to_string(),
        ));
    }
    let ciphertext = STANDARD
        .decode(&envelope.ciphertext)
        .map_err(|e| QuireError::DecryptionFailed(format!("Malformed ciphertext: {}", e)))?;
    let nonce = STANDARD
        .decode(&envelope.nonce)
        .map_err(|e| QuireError::DecryptionFailed(format!("Malformed nonce: {}", e)))?;
    let plaintext = Zeroizing::new(aead_open(key.as_bytes(), &nonce, &ciphertext)?);
    String::from_utf8(plaintext.to_vec())
        .map_err(|_| QuireError::DecryptionFailed("Plaintext is not valid UTF-8".to_string()))
}

/// Derive the key for one note from the master key and the note id.
///
/// The result is fully determined by `(master, note_id)`, so note keys
/// cannot be rotated on their own; rotation means re-encrypting under a new
/// master key.
pub fn derive_note_key(master: &MasterKey, note_id: &str) -> Result<SymmetricKey> {
    if note_id.is_empty() {
        return Err(QuireError::InvalidInput(
            "Note id cannot be empty".to_string(),
        ));
    }
    let okm = hkdf_sha256(
        master.key().as_bytes(),
        NOTE_KEY_CONTEXT,
        note_id.as_bytes(),
    )?;
    Ok(SymmetricKey::from_bytes(okm))
}

/// Encrypt note content under its note key.
pub fn encrypt_note(content: &str, note_id: &str, master: &MasterKey) -> Result<Envelope> {
    let note_key = derive_note_key(master, note_id)?;
    encrypt(content, &note_key)
}

/// Decrypt note content under its note key.
pub fn decrypt_note(envelope: &Envelope, note_id: &str, master: &MasterKey) -> Result<String> {
    let note_key = derive_note_key(master, note_id)?;
    decrypt(envelope, &note_key)
}

/// Serialize a value to JSON and encrypt it.
pub fn seal_json<T: Serialize>(value: &T, key: &SymmetricKey) -> Result<Envelope> {
    let json = Zeroizing::new(serde_json::to_string(value)?);
    encrypt(&json, key)
}

/// Decrypt an envelope and deserialize its JSON payload.
pub fn open_json<T: DeserializeOwned>(envelope: &Envelope, key: &SymmetricKey) -> Result<T> {
    let json = Zeroizing::new(decrypt(envelope, key)?);
    serde_json::from_str(&json)
        .map_err(|e| QuireError::DecryptionFailed(format!("Decrypted payload is not valid JSON: {}", e)))
}
