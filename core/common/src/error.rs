//! Common error types for PpkVault.

use thiserror::Error;

/// Top-level error type for PpkVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The asymmetric provider did not produce a usable key pair.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Wrong password or corrupted ciphertext.
    ///
    /// Both causes are reported the same way.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// An envelope was produced by a different key pair than the one
    /// attempting to open it.
    #[error("Key pair mismatch: expected {expected}, envelope was sealed for {actual}")]
    KeyMismatch {
        /// Id of the key pair attempting decryption.
        expected: String,
        /// Id embedded in the envelope.
        actual: String,
    },

    /// Envelope text does not have the expected structure.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Decryption was attempted with a handle that only holds a public key.
    #[error("No private key loaded")]
    NoPrivateKey,

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Whether this error means "wrong password or corrupt data".
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, Error::Decryption(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
