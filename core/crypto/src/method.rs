//! Named symmetric encryption methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use ppkvault_common::{Error, Result};

/// Identifies how a piece of ciphertext is protected.
///
/// The serialized names are persisted in key pair and master key records
/// and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionMethod {
    /// Password-sealed master key content.
    KeyV1,
    /// Password-sealed arbitrary strings (e.g. private key PEM).
    StringV1,
    /// Protected by a custom handler rather than a password.
    Custom,
}

impl EncryptionMethod {
    /// Stable name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMethod::KeyV1 => "KeyV1",
            EncryptionMethod::StringV1 => "StringV1",
            EncryptionMethod::Custom => "Custom",
        }
    }

    /// Whether the method derives its key from a password.
    pub fn is_password_based(&self) -> bool {
        !matches!(self, EncryptionMethod::Custom)
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "KeyV1" => Ok(EncryptionMethod::KeyV1),
            "StringV1" => Ok(EncryptionMethod::StringV1),
            "Custom" => Ok(EncryptionMethod::Custom),
            other => Err(Error::InvalidInput(format!(
                "Unknown encryption method: {}",
                other
            ))),
        }
    }
}
