//! Key pair generation and loading.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PpkConfig;
use crate::handler::PpkHandler;
use crate::key_pair::{EncryptedPrivateKey, KeyPair};
use ppkvault_common::{now_millis, Error, KeyId, Result};
use ppkvault_crypto::{
    AsymmetricHandle, AsymmetricKeyProvider, EncryptionConfig, EncryptionService,
    RsaKeyProvider, StandardEncryptionService,
};

/// Entry point for every key pair and master key operation.
///
/// The service holds no key material. Every call that needs a private key
/// loads it, uses it and drops it before returning.
pub struct PpkService {
    pub(crate) encryption: Arc<dyn EncryptionService>,
    provider: Arc<dyn AsymmetricKeyProvider>,
    config: PpkConfig,
}

impl PpkService {
    /// Create a service from its collaborators.
    ///
    /// # Errors
    /// - Returns error if `config` fails validation
    pub fn new(
        encryption: Arc<dyn EncryptionService>,
        provider: Arc<dyn AsymmetricKeyProvider>,
        config: PpkConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            encryption,
            provider,
            config,
        })
    }

    /// Service backed by [`StandardEncryptionService`] and RSA-OAEP.
    pub fn standard(encryption_config: EncryptionConfig, config: PpkConfig) -> Result<Self> {
        Self::new(
            Arc::new(StandardEncryptionService::new(encryption_config)),
            Arc::new(RsaKeyProvider::new()),
            config,
        )
    }

    /// Get the encryption service.
    pub fn encryption(&self) -> &Arc<dyn EncryptionService> {
        &self.encryption
    }

    /// Get the configuration.
    pub fn config(&self) -> &PpkConfig {
        &self.config
    }

    /// Generate a new key pair whose private half is sealed under `password`.
    ///
    /// Nothing is persisted; storing the result is the caller's job.
    ///
    /// # Errors
    /// - `KeyGeneration` if the provider does not yield a usable pair
    /// - encryption service errors while sealing the private key
    pub async fn generate_key_pair(&self, password: &str) -> Result<KeyPair> {
        let handle = self
            .provider
            .generate_key_pair(self.config.key_size, self.config.public_exponent)
            .await?;

        if !handle.has_private_key() || !handle.has_public_key() {
            return Err(Error::KeyGeneration(
                "Provider returned an incomplete key pair".to_string(),
            ));
        }

        let public_key = handle
            .export_public_key()
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let private_pem = handle
            .export_private_key()
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;

        let method = self.config.private_key_method;
        let ciphertext = self.encryption.encrypt(method, password, &private_pem).await?;

        let key_pair = KeyPair {
            id: KeyId::generate(),
            key_size: handle.key_size().unwrap_or(self.config.key_size),
            public_key,
            private_key: EncryptedPrivateKey {
                encryption_method: method,
                ciphertext,
            },
            created_time: now_millis(),
        };

        info!(ppk_id = %key_pair.id, key_size = key_pair.key_size, "Generated key pair");
        Ok(key_pair)
    }

    /// Load both halves of a key pair.
    ///
    /// # Errors
    /// - `Decryption` if the password is wrong or the record is corrupt
    pub async fn load_key_pair(
        &self,
        key_pair: &KeyPair,
        password: &str,
    ) -> Result<Box<dyn AsymmetricHandle>> {
        debug!(ppk_id = %key_pair.id, "Loading key pair");

        let mut handle = self
            .load_public_half(key_pair)
            .map_err(|e| Error::Decryption(e.to_string()))?;

        let private_pem = self
            .encryption
            .decrypt(
                key_pair.private_key.encryption_method,
                password,
                &key_pair.private_key.ciphertext,
            )
            .await?;
        handle.import_private_key(&private_pem)?;

        Ok(handle)
    }

    /// Load only the public half of a key pair.
    ///
    /// The returned handle encrypts; decrypting fails with `NoPrivateKey`.
    pub fn load_public_key(&self, public_key: &str) -> Result<Box<dyn AsymmetricHandle>> {
        let mut handle = self.provider.new_handle();
        handle.import_public_key(public_key)?;
        Ok(handle)
    }

    /// Import the public key of `key_pair` and check its declared size.
    ///
    /// # Errors
    /// - `InvalidInput` if the key does not import or its size differs
    fn load_public_half(&self, key_pair: &KeyPair) -> Result<Box<dyn AsymmetricHandle>> {
        let handle = self.load_public_key(&key_pair.public_key)?;

        if handle.key_size() != Some(key_pair.key_size) {
            return Err(Error::InvalidInput(format!(
                "Key pair {} declares {} bits but its public key has {:?}",
                key_pair.id,
                key_pair.key_size,
                handle.key_size()
            )));
        }
        Ok(handle)
    }

    /// Check whether `password` opens `key_pair`.
    ///
    /// Wrong passwords and corrupt records both yield `false`.
    pub async fn validate_password(&self, key_pair: &KeyPair, password: &str) -> bool {
        match self.load_key_pair(key_pair, password).await {
            Ok(_) => true,
            Err(_) => {
                debug!(ppk_id = %key_pair.id, "Key pair password check failed");
                false
            }
        }
    }

    /// Handler able to encrypt and decrypt with `key_pair`.
    pub async fn handler(&self, key_pair: &KeyPair, password: &str) -> Result<PpkHandler> {
        let handle = self.load_key_pair(key_pair, password).await?;
        Ok(PpkHandler::new(key_pair.id.clone(), handle))
    }

    /// Handler able to encrypt for `key_pair` without its password.
    ///
    /// # Errors
    /// - `InvalidInput` if the public key is unusable or does not match `key_size`
    pub fn public_key_handler(&self, key_pair: &KeyPair) -> Result<PpkHandler> {
        let handle = self.load_public_half(key_pair)?;
        Ok(PpkHandler::new(key_pair.id.clone(), handle))
    }
}
