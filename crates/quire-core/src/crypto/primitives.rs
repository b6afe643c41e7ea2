//! Thin adapter over the RustCrypto primitives.
//!
//! Nothing in here is reimplemented; every function forwards to an audited
//! crate and maps its failure into the core error taxonomy.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::{QuireError, Result};

/// Symmetric key length in bytes (256 bits).
pub const KEY_LENGTH: usize = 32;

/// XChaCha20 nonce length in bytes.
pub const NONCE_LENGTH: usize = 24;

/// HMAC-SHA256 output length in bytes.
pub const MAC_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Fill a fixed-size buffer from the operating system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    rand::rngs::OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| QuireError::CryptoUnavailable(format!("CSPRNG failed: {}", e)))?;
    Ok(out)
}

/// Encrypt with XChaCha20-Poly1305 under a fresh random nonce.
///
/// Returns `(nonce, ciphertext || tag)`.
pub fn aead_seal(key: &[u8; KEY_LENGTH], plaintext: &[u8]) -> Result<([u8; NONCE_LENGTH], Vec<u8>)> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| QuireError::CryptoUnavailable("Invalid AEAD key length".to_string()))?;
    let nonce_bytes: [u8; NONCE_LENGTH] = random_bytes()?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| QuireError::CryptoUnavailable("AEAD encryption failed".to_string()))?;
    Ok((nonce_bytes, ciphertext))
}

/// Decrypt and authenticate XChaCha20-Poly1305 output.
pub fn aead_open(key: &[u8; KEY_LENGTH], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LENGTH {
        return Err(QuireError::DecryptionFailed(format!(
            "Nonce must be {} bytes (got {})",
            NONCE_LENGTH,
            nonce.len()
        )));
    }
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| QuireError::CryptoUnavailable("Invalid AEAD key length".to_string()))?;
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            QuireError::DecryptionFailed(
                "Authentication tag mismatch (wrong key or corrupted data)".to_string(),
            )
        })
}

/// HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; MAC_LENGTH]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| QuireError::CryptoUnavailable(format!("HMAC init failed: {}", e)))?;
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    let mut out = [0u8; MAC_LENGTH];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// PBKDF2-HMAC-SHA256 into a 32-byte buffer.
pub fn pbkdf2_sha256(secret: &[u8], salt: &[u8], rounds: u32) -> [u8; KEY_LENGTH] {
    let mut out = [0u8; KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, rounds, &mut out);
    out
}

/// HKDF-SHA256 extract-and-expand to a 32-byte key.
pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; KEY_LENGTH]> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; KEY_LENGTH];
    hk.expand(info, &mut okm)
        .map_err(|e| QuireError::CryptoUnavailable(format!("HKDF expand failed: {}", e)))?;
    Ok(okm)
}

/// Compare two byte strings without short-circuiting on the first mismatch.
///
/// Length is not secret; a length mismatch returns early.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
