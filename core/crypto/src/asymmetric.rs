//! Asymmetric key provider traits.
//!
//! A provider creates handles; a handle holds a public key and, optionally,
//! the matching private key. Handles are cheap to build and are meant to be
//! discarded after a single operation.

use async_trait::async_trait;
use zeroize::Zeroizing;

use ppkvault_common::Result;

/// A loaded asymmetric key (public, or public + private).
pub trait AsymmetricHandle: Send + Sync {
    /// Stable tag naming the padding scheme of [`AsymmetricHandle::encrypt`].
    fn scheme(&self) -> &'static str;

    /// Import a public key from its text encoding.
    fn import_public_key(&mut self, encoded: &str) -> Result<()>;

    /// Import a private key from its text encoding.
    ///
    /// If a public key is already loaded, the private key must match it.
    fn import_private_key(&mut self, encoded: &str) -> Result<()>;

    /// Whether a public key is loaded.
    fn has_public_key(&self) -> bool;

    /// Whether a private key is loaded.
    fn has_private_key(&self) -> bool;

    /// Modulus size in bits, if a key is loaded.
    fn key_size(&self) -> Option<usize>;

    /// Export the public key as text.
    fn export_public_key(&self) -> Result<String>;

    /// Export the private key as text.
    fn export_private_key(&self) -> Result<Zeroizing<String>>;

    /// Encrypt arbitrary-length data with the public key.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt data produced by [`AsymmetricHandle::encrypt`].
    ///
    /// # Errors
    /// - `NoPrivateKey` if only a public key is loaded
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Factory for asymmetric handles.
#[async_trait]
pub trait AsymmetricKeyProvider: Send + Sync {
    /// Stable tag naming the scheme of handles from this provider.
    fn scheme(&self) -> &'static str;

    /// Generate a new key pair.
    async fn generate_key_pair(
        &self,
        bits: usize,
        exponent: u64,
    ) -> Result<Box<dyn AsymmetricHandle>>;

    /// Create an empty handle, ready for imports.
    fn new_handle(&self) -> Box<dyn AsymmetricHandle>;
}
