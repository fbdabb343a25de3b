//! Key pair configuration.

use serde::{Deserialize, Serialize};

use ppkvault_common::{Error, Result};
use ppkvault_crypto::EncryptionMethod;

/// Parameters for generating key pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpkConfig {
    /// Modulus size in bits.
    pub key_size: usize,
    /// RSA public exponent.
    pub public_exponent: u64,
    /// Method sealing the private key under the user's password.
    pub private_key_method: EncryptionMethod,
}

impl PpkConfig {
    /// Check the configuration for values that must never be used.
    ///
    /// # Errors
    /// - key size below 2048 bits or not a whole number of bytes
    /// - even or trivially small public exponent
    /// - a private key method that is not password based
    pub fn validate(&self) -> Result<()> {
        if self.key_size < 2048 || self.key_size % 8 != 0 {
            return Err(Error::InvalidInput(format!(
                "Invalid key size {}: must be a multiple of 8 and at least 2048",
                self.key_size
            )));
        }
        if self.public_exponent < 3 || self.public_exponent % 2 == 0 {
            return Err(Error::InvalidInput(format!(
                "Invalid public exponent {}",
                self.public_exponent
            )));
        }
        if !self.private_key_method.is_password_based() {
            return Err(Error::InvalidInput(format!(
                "Private keys cannot be protected with {}",
                self.private_key_method
            )));
        }
        Ok(())
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for PpkConfig {
    fn default() -> Self {
        Self {
            key_size: 2048,
            public_exponent: 65537,
            private_key_method: EncryptionMethod::StringV1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PpkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_size, 2048);
        assert_eq!(config.public_exponent, 65537);
    }

    #[test]
    fn test_rejects_weak_values() {
        let small = PpkConfig {
            key_size: 1024,
            ..PpkConfig::default()
        };
        assert!(small.validate().is_err());

        let even = PpkConfig {
            public_exponent: 65536,
            ..PpkConfig::default()
        };
        assert!(even.validate().is_err());

        let custom = PpkConfig {
            private_key_method: EncryptionMethod::Custom,
            ..PpkConfig::default()
        };
        assert!(custom.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PpkConfig::from_json(r#"{"key_size": 3072}"#).unwrap();
        assert_eq!(config.key_size, 3072);
        assert_eq!(config.private_key_method, EncryptionMethod::StringV1);

        let restored = PpkConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }
}
