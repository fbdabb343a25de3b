//! Key types with secure memory handling.
//!
//! Symmetric keys zeroize their memory on drop so password-derived
//! material does not outlive the call that needed it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use ppkvault_common::{Error, Result};

/// Length of symmetric encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of salts in bytes.
pub const SALT_LENGTH: usize = 32;

/// Number of random bytes in a freshly generated master key.
pub const MASTER_KEY_LENGTH: usize = 256;

/// Symmetric key derived from a user password.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    /// Create a derived key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Decryption(format!("Invalid salt encoding: {}", e)))?;
        let array: [u8; SALT_LENGTH] = bytes
            .try_into()
            .map_err(|_| Error::Decryption("Invalid salt length".to_string()))?;
        Ok(Self(array))
    }
}

/// Generate the plaintext content of a new master key.
///
/// Returns `MASTER_KEY_LENGTH` random bytes, hex encoded.
pub fn generate_master_key_hex() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; MASTER_KEY_LENGTH]);
    rand::thread_rng().fill_bytes(&mut bytes[..]);
    Zeroizing::new(hex::encode(&bytes[..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate();
        let salt2 = Salt::generate();

        // Random salts should be different
        assert_ne!(salt1.as_bytes(), salt2.as_bytes());
    }

    #[test]
    fn test_salt_base64() {
        let salt = Salt::from_bytes([7u8; SALT_LENGTH]);
        let restored = Salt::from_base64(&salt.to_base64()).unwrap();
        assert_eq!(salt, restored);

        assert!(Salt::from_base64("c2hvcnQ=").is_err());
    }

    #[test]
    fn test_master_key_hex() {
        let a = generate_master_key_hex();
        let b = generate_master_key_hex();

        assert_eq!(a.len(), MASTER_KEY_LENGTH * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_derived_key_debug_redacted() {
        let key = DerivedKey::from_bytes([9u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
