//! Master key records.

use serde::{Deserialize, Serialize};

use crate::method::EncryptionMethod;
use ppkvault_common::{now_millis, Error, KeyId, Result};

/// Encrypted content of a master key together with how it is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyContent {
    /// Scheme protecting `content`.
    pub encryption_method: EncryptionMethod,
    /// Sealed text (password methods) or handler envelope (`Custom`).
    pub content: String,
}

/// A persisted master key.
///
/// Decrypting `content` yields the hex encoding of the data-encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterKeyEntity {
    /// Stable identifier.
    pub id: KeyId,
    /// Creation time, epoch milliseconds.
    pub created_time: i64,
    /// Last time the encrypted content changed, epoch milliseconds.
    pub updated_time: i64,
    /// Application that created the key.
    #[serde(default)]
    pub source_application: String,
    /// Scheme protecting `content`.
    pub encryption_method: EncryptionMethod,
    /// Encrypted key material.
    pub content: String,
    /// Whether any item has been encrypted with this key yet.
    #[serde(default)]
    pub has_been_used: bool,
}

impl MasterKeyEntity {
    /// Create a new master key record around freshly encrypted content.
    pub fn new(source_application: impl Into<String>, content: MasterKeyContent) -> Self {
        let now = now_millis();
        Self {
            id: KeyId::generate(),
            created_time: now,
            updated_time: now,
            source_application: source_application.into(),
            encryption_method: content.encryption_method,
            content: content.content,
            has_been_used: false,
        }
    }

    /// Copy of this record with its encrypted content replaced.
    ///
    /// All other fields are kept; `updated_time` is refreshed.
    pub fn with_content(&self, content: MasterKeyContent) -> Self {
        Self {
            encryption_method: content.encryption_method,
            content: content.content,
            updated_time: now_millis(),
            ..self.clone()
        }
    }

    /// Whether the content is protected by a key pair rather than a password.
    pub fn is_custom_protected(&self) -> bool {
        self.encryption_method == EncryptionMethod::Custom
    }

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

    fn content(method: EncryptionMethod, text: &str) -> MasterKeyContent {
        MasterKeyContent {
            encryption_method: method,
            content: text.to_string(),
        }
    }

    #[test]
    fn test_with_content_keeps_identity() {
        let original = MasterKeyEntity::new("tests", content(EncryptionMethod::KeyV1, "a"));
        let replaced = original.with_content(content(EncryptionMethod::Custom, "b"));

        assert_eq!(replaced.id, original.id);
        assert_eq!(replaced.created_time, original.created_time);
        assert_eq!(replaced.source_application, "tests");
        assert_eq!(replaced.encryption_method, EncryptionMethod::Custom);
        assert_eq!(replaced.content, "b");
        assert!(replaced.updated_time >= original.updated_time);
        assert!(replaced.is_custom_protected());
    }

    #[test]
    fn test_json_roundtrip_uses_snake_case() {
        let key = MasterKeyEntity::new("tests", content(EncryptionMethod::KeyV1, "sealed"));
        let json = key.to_json().unwrap();

        assert!(json.contains("\"encryption_method\": \"KeyV1\""));
        assert_eq!(MasterKeyEntity::from_json(&json).unwrap(), key);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"id":"abc","created_time":1,"updated_time":2,
            "encryption_method":"KeyV1","content":"x"}"#;
        let key = MasterKeyEntity::from_json(json).unwrap();
        assert!(!key.has_been_used);
        assert_eq!(key.source_application, "");
    }
}
