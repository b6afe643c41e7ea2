//! Key derivation from passphrases and device secrets.
//!
//! Both the master key and the device key are stretched with
//! PBKDF2-HMAC-SHA256 at the round count carried in [`KdfParams`].

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use super::key::{Salt, SymmetricKey};
use super::primitives::{pbkdf2_sha256, random_bytes};
use crate::error::{QuireError, Result};

/// Minimum decoded salt length accepted by the KDF.
const MIN_SALT_BYTES: usize = 16;

/// Versioned PBKDF2 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Parameter set version, recorded so a future upgrade can detect old keys.
    pub version: u8,
    /// PBKDF2-HMAC-SHA256 rounds.
    pub rounds: u32,
}

impl KdfParams {
    /// 2.1M rounds of PBKDF2-HMAC-SHA256, 32-byte output.
    pub const V1: KdfParams = KdfParams {
        version: 1,
        rounds: 2_100_000,
    };

    /// Parameters used for every key written by this build.
    pub const CURRENT: KdfParams = Self::V1;

    /// Cheap parameters for test suites.
    ///
    /// Never use these for data that matters: keys derived with them are
    /// trivially brute-forced.
    pub const fn insecure_for_tests() -> Self {
        KdfParams {
            version: 0,
            rounds: 1_000,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Derive a 32-byte key on the current thread.
///
/// # Security
///
/// - Same secret + salt always produces the same key
/// - Different salt produces a different key
/// - Blocks for the full PBKDF2 cost; async callers should use [`derive_key`]
pub fn derive_key_blocking(secret: &[u8], salt: &Salt, params: KdfParams) -> Result<SymmetricKey> {
    if secret.is_empty() {
        return Err(QuireError::InvalidInput(
            "Secret cannot be empty".to_string(),
        ));
    }

    let salt_bytes = salt.to_bytes()?;
    if salt_bytes.len() < MIN_SALT_BYTES {
        return Err(QuireError::InvalidInput(format!(
            "Salt must be at least {} bytes",
            MIN_SALT_BYTES
        )));
    }

    if params.rounds < KdfParams::CURRENT.rounds {
        tracing::warn!(
            rounds = params.rounds,
            "deriving key with reduced PBKDF2 rounds"
        );
    }

    Ok(SymmetricKey::from_bytes(pbkdf2_sha256(
        secret,
        &salt_bytes,
        params.rounds,
    )))
}

/// Derive a 32-byte key on the blocking pool.
///
/// A panicked or cancelled worker surfaces as `CryptoUnavailable`; there is
/// no fallback to a weaker derivation.
pub async fn derive_key(secret: &SecretString, salt: &Salt, params: KdfParams) -> Result<SymmetricKey> {
    let secret = Zeroizing::new(secret.expose_secret().as_bytes().to_vec());
    let salt = salt.clone();
    tokio::task::spawn_blocking(move || derive_key_blocking(&secret, &salt, params))
        .await
        .map_err(|e| QuireError::CryptoUnavailable(format!("Key derivation task failed: {}", e)))?
}

/// Generate a random RFC 4122 version 4 device identifier.
pub fn generate_device_id() -> Result<String> {
    let bytes: [u8; 16] = random_bytes()?;
    Ok(uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string())
}
