//! Encryption service.
//!
//! The service seals strings and master keys under passwords. Callers that
//! need a different protection scheme plug in a [`CustomHandler`] through
//! [`EncryptionScheme::Custom`]; the service then stores whatever the handler
//! produces and tags it as [`EncryptionMethod::Custom`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::kdf::KdfParams;
use crate::keys::generate_master_key_hex;
use crate::master_key::{MasterKeyContent, MasterKeyEntity};
use crate::method::EncryptionMethod;
use crate::sealed;
use ppkvault_common::{Error, Result};

/// Pluggable encrypt/decrypt pair used in place of a password.
pub trait CustomHandler: Send + Sync {
    /// Encrypt `plaintext`, returning self-describing text.
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Reverse of [`CustomHandler::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>>;
}

/// How a master key operation protects (or opens) content.
#[derive(Clone, Copy)]
pub enum EncryptionScheme<'a> {
    /// Derive the key from this password.
    Password(&'a str),
    /// Delegate to a custom handler.
    Custom(&'a dyn CustomHandler),
}

impl fmt::Debug for EncryptionScheme<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionScheme::Password(_) => write!(f, "Password([REDACTED])"),
            EncryptionScheme::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Configuration for [`StandardEncryptionService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// KDF parameters for [`EncryptionMethod::StringV1`].
    pub string_kdf: KdfParams,
    /// KDF parameters for [`EncryptionMethod::KeyV1`].
    pub key_kdf: KdfParams,
    /// Method used when a master key is sealed under a password.
    pub master_key_method: EncryptionMethod,
    /// Recorded on every master key this service creates.
    pub source_application: String,
}

impl EncryptionConfig {
    /// Configuration with the cheapest KDF settings. Only for tests.
    pub fn minimal() -> Self {
        Self {
            string_kdf: KdfParams::minimal(),
            key_kdf: KdfParams::minimal(),
            ..Self::default()
        }
    }

    /// Use the same KDF parameters for every method.
    pub fn with_kdf(mut self, params: KdfParams) -> Self {
        self.string_kdf = params;
        self.key_kdf = params;
        self
    }

    /// KDF parameters for a password-based method.
    pub fn kdf_for(&self, method: EncryptionMethod) -> Result<KdfParams> {
        match method {
            EncryptionMethod::KeyV1 => Ok(self.key_kdf),
            EncryptionMethod::StringV1 => Ok(self.string_kdf),
            EncryptionMethod::Custom => Err(Error::InvalidInput(
                "Custom method has no password scheme".to_string(),
            )),
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            string_kdf: KdfParams::moderate(),
            key_kdf: KdfParams::interactive(),
            master_key_method: EncryptionMethod::KeyV1,
            source_application: "net.ppkvault".to_string(),
        }
    }
}

/// Password encryption and master key management.
///
/// Implementors provide the two password primitives; the master key
/// operations are built on top of them.
#[async_trait]
pub trait EncryptionService: Send + Sync {
    /// Seal `plaintext` with a password-based method.
    async fn encrypt(
        &self,
        method: EncryptionMethod,
        password: &str,
        plaintext: &str,
    ) -> Result<String>;

    /// Open text produced by [`EncryptionService::encrypt`].
    ///
    /// # Errors
    /// - `Decryption` on a wrong password or corrupt ciphertext
    async fn decrypt(
        &self,
        method: EncryptionMethod,
        password: &str,
        ciphertext: &str,
    ) -> Result<Zeroizing<String>>;

    /// Method used when sealing master keys under a password.
    fn master_key_method(&self) -> EncryptionMethod;

    /// Application name recorded on new master keys.
    fn source_application(&self) -> &str;

    /// Encrypt master key plaintext under `scheme`.
    ///
    /// `method` selects the password method and defaults to
    /// [`EncryptionService::master_key_method`]; it is ignored for
    /// custom schemes, which always yield [`EncryptionMethod::Custom`].
    async fn encrypt_master_key_content(
        &self,
        method: Option<EncryptionMethod>,
        plaintext: &str,
        scheme: EncryptionScheme<'_>,
    ) -> Result<MasterKeyContent> {
        match scheme {
            EncryptionScheme::Custom(handler) => Ok(MasterKeyContent {
                encryption_method: EncryptionMethod::Custom,
                content: handler.encrypt(plaintext)?,
            }),
            EncryptionScheme::Password(password) => {
                let method = method.unwrap_or_else(|| self.master_key_method());
                let content = self.encrypt(method, password, plaintext).await?;
                Ok(MasterKeyContent {
                    encryption_method: method,
                    content,
                })
            }
        }
    }

    /// Generate a new random master key protected by `scheme`.
    async fn generate_master_key(&self, scheme: EncryptionScheme<'_>) -> Result<MasterKeyEntity> {
        let plaintext = generate_master_key_hex();
        let content = self
            .encrypt_master_key_content(None, &plaintext, scheme)
            .await?;
        let master_key = MasterKeyEntity::new(self.source_application(), content);

        info!(
            master_key_id = %master_key.id,
            method = %master_key.encryption_method,
            "Generated master key"
        );
        Ok(master_key)
    }

    /// Decrypt the content of `master_key`.
    ///
    /// # Errors
    /// - `InvalidInput` if the scheme does not match how the key is protected
    /// - `Decryption` on a wrong password or corrupt content
    /// - whatever the custom handler reports
    async fn decrypt_master_key_content(
        &self,
        master_key: &MasterKeyEntity,
        scheme: EncryptionScheme<'_>,
    ) -> Result<Zeroizing<String>> {
        debug!(master_key_id = %master_key.id, ?scheme, "Decrypting master key");

        match (master_key.encryption_method, scheme) {
            (EncryptionMethod::Custom, EncryptionScheme::Custom(handler)) => {
                handler.decrypt(&master_key.content)
            }
            (EncryptionMethod::Custom, EncryptionScheme::Password(_)) => {
                Err(Error::InvalidInput(format!(
                    "Master key {} is protected by a key pair",
                    master_key.id
                )))
            }
            (_, EncryptionScheme::Custom(_)) => Err(Error::InvalidInput(format!(
                "Master key {} is protected by a password",
                master_key.id
            ))),
            (method, EncryptionScheme::Password(password)) => {
                self.decrypt(method, password, &master_key.content).await
            }
        }
    }

    /// Decrypt with one scheme and encrypt with another.
    ///
    /// Returns a replacement record; the input is left untouched and must be
    /// kept until the replacement has been persisted.
    async fn reencrypt_master_key(
        &self,
        master_key: &MasterKeyEntity,
        decrypt_scheme: EncryptionScheme<'_>,
        encrypt_scheme: EncryptionScheme<'_>,
    ) -> Result<MasterKeyEntity> {
        let plaintext = self
            .decrypt_master_key_content(master_key, decrypt_scheme)
            .await?;
        let content = self
            .encrypt_master_key_content(None, &plaintext, encrypt_scheme)
            .await?;

        info!(
            master_key_id = %master_key.id,
            from = %master_key.encryption_method,
            to = %content.encryption_method,
            "Re-encrypted master key"
        );
        Ok(master_key.with_content(content))
    }
}

/// Argon2id + XChaCha20-Poly1305 implementation of [`EncryptionService`].
#[derive(Debug, Clone, Default)]
pub struct StandardEncryptionService {
    config: EncryptionConfig,
}

impl StandardEncryptionService {
    /// Create a service with the given configuration.
    pub fn new(config: EncryptionConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &EncryptionConfig {
        &self.config
    }
}

#[async_trait]
impl EncryptionService for StandardEncryptionService {
    async fn encrypt(
        &self,
        method: EncryptionMethod,
        password: &str,
        plaintext: &str,
    ) -> Result<String> {
        let params = self.config.kdf_for(method)?;
        let password = Zeroizing::new(password.to_owned());
        let plaintext = Zeroizing::new(plaintext.to_owned());

        // Argon2id is CPU and memory bound.
        tokio::task::spawn_blocking(move || {
            sealed::seal(method, &password, plaintext.as_bytes(), &params)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Encryption task failed: {}", e)))?
    }

    async fn decrypt(
        &self,
        method: EncryptionMethod,
        password: &str,
        ciphertext: &str,
    ) -> Result<Zeroizing<String>> {
        if !method.is_password_based() {
            return Err(Error::InvalidInput(format!(
                "{} cannot be opened with a password",
                method
            )));
        }
        let password = Zeroizing::new(password.to_owned());
        let ciphertext = ciphertext.to_owned();

        let mut bytes = tokio::task::spawn_blocking(move || {
            sealed::open(method, &password, &ciphertext)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Decryption task failed: {}", e)))??;

        String::from_utf8(std::mem::take(&mut *bytes))
            .map(Zeroizing::new)
            .map_err(|_| Error::Decryption("Plaintext is not valid UTF-8".to_string()))
    }

    fn master_key_method(&self) -> EncryptionMethod {
        self.config.master_key_method
    }

    fn source_application(&self) -> &str {
        &self.config.source_application
    }
}
