//! Key material types.
//!
//! Every key type zeroizes its bytes on drop and redacts itself in `Debug`
//! output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::ZeroizeOnDrop;

use super::primitives::{random_bytes, KEY_LENGTH};
use crate::error::{QuireError, Result};

/// Salt length in bytes.
pub const SALT_LENGTH: usize = 32;

/// A 256-bit symmetric key.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: [u8; KEY_LENGTH],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    ///
    /// # Security
    ///
    /// The caller is responsible for ensuring the bytes come from a KDF or CSPRNG.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Generate a random key from the OS CSPRNG.
    pub fn generate() -> Result<Self> {
        Ok(Self::from_bytes(random_bytes()?))
    }

    /// Get a reference to the raw key bytes.
    ///
    /// # Security
    ///
    /// Avoid storing or logging this value. Use only for immediate crypto operations.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Key derived from the user's passphrase. Held in memory only.
#[derive(Clone, Debug)]
pub struct MasterKey(SymmetricKey);

impl MasterKey {
    pub fn new(key: SymmetricKey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.0
    }
}

/// Key derived from the per-installation device identifier.
#[derive(Clone, Debug)]
pub struct DeviceKey(SymmetricKey);

impl DeviceKey {
    pub fn new(key: SymmetricKey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.0
    }
}

/// Base64-encoded random salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(String);

impl Salt {
    /// Generate a fresh 32-byte salt from the OS CSPRNG.
    pub fn generate() -> Result<Self> {
        let bytes: [u8; SALT_LENGTH] = random_bytes()?;
        Ok(Self(STANDARD.encode(bytes)))
    }

    /// Parse a stored salt, rejecting anything that is not base64.
    pub fn parse(encoded: &str) -> Result<Self> {
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| QuireError::Validation(format!("Salt is not valid base64: {}", e)))?;
        Ok(Self(encoded.trim().to_string()))
    }

    /// The base64 form, as persisted.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded salt bytes fed to the KDF.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.0)
            .map_err(|e| QuireError::Validation(format!("Salt is not valid base64: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_debug_redacts() {
        let key = SymmetricKey::from_bytes([0xAB; KEY_LENGTH]);
        let debug_output = format!("{:?}", MasterKey::new(key));
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("ab"));
        assert!(!debug_output.contains("171"));
    }

    #[test]
    fn test_salt_generate_is_32_bytes() {
        let salt = Salt::generate().unwrap();
        assert_eq!(salt.to_bytes().unwrap().len(), SALT_LENGTH);
    }

    #[test]
    fn test_salts_are_unique() {
        assert_ne!(Salt::generate().unwrap(), Salt::generate().unwrap());
    }

    #[test]
    fn test_salt_parse_rejects_garbage() {
        assert!(Salt::parse("not base64 !!").is_err());
        assert!(Salt::parse(Salt::generate().unwrap().as_str()).is_ok());
    }
}
