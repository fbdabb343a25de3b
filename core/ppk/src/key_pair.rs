//! Persisted key pair records.

use serde::{Deserialize, Serialize};

use ppkvault_common::{Error, KeyId, Result};
use ppkvault_crypto::EncryptionMethod;

fn default_key_size() -> usize {
    2048
}

/// Private key sealed under the user's password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPrivateKey {
    /// Method used to seal `ciphertext`.
    pub encryption_method: EncryptionMethod,
    /// Sealed PEM text of the private key.
    pub ciphertext: String,
}

/// A public/private key pair as stored in sync metadata.
///
/// The record is immutable once created. `id` is embedded in every
/// envelope produced with the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// Stable identifier.
    pub id: KeyId,
    /// Modulus size in bits.
    #[serde(default = "default_key_size")]
    pub key_size: usize,
    /// Public key, PKCS#1 PEM.
    pub public_key: String,
    /// Password-sealed private key.
    pub private_key: EncryptedPrivateKey,
    /// Creation time, epoch milliseconds.
    pub created_time: i64,
}

impl KeyPair {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape() {
        let key_pair = KeyPair {
            id: KeyId::new("0123456789abcdef0123456789abcdef").unwrap(),
            key_size: 2048,
            public_key: "-----BEGIN RSA PUBLIC KEY-----".to_string(),
            private_key: EncryptedPrivateKey {
                encryption_method: EncryptionMethod::StringV1,
                ciphertext: "{}".to_string(),
            },
            created_time: 1_700_000_000_000,
        };

        let value: serde_json::Value =
            serde_json::from_str(&key_pair.to_json().unwrap()).unwrap();
        assert_eq!(value["id"], "0123456789abcdef0123456789abcdef");
        assert_eq!(value["publicKey"], "-----BEGIN RSA PUBLIC KEY-----");
        assert_eq!(value["privateKey"]["encryptionMethod"], "StringV1");
        assert_eq!(value["privateKey"]["ciphertext"], "{}");
        assert_eq!(value["createdTime"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_key_size_defaults_when_absent() {
        let json = r#"{
            "id": "abc",
            "publicKey": "pem",
            "privateKey": {"encryptionMethod": "StringV1", "ciphertext": "x"},
            "createdTime": 1
        }"#;
        let key_pair = KeyPair::from_json(json).unwrap();
        assert_eq!(key_pair.key_size, 2048);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            KeyPair::from_json("{"),
            Err(Error::Serialization(_))
        ));
    }
}
