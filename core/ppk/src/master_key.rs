//! Master key operations involving key pairs.
//!
//! Every re-encryption returns a replacement [`MasterKeyEntity`]. The caller
//! must persist the replacement before discarding the original; until then
//! the original remains the only readable copy.

use tracing::debug;
use zeroize::Zeroizing;

use crate::key_pair::KeyPair;
use crate::service::PpkService;
use ppkvault_common::Result;
use ppkvault_crypto::{EncryptionScheme, EncryptionService, MasterKeyEntity};

impl PpkService {
    /// Generate a master key readable only with `key_pair`.
    ///
    /// # Errors
    /// - `Decryption` if `password` does not open the key pair
    pub async fn generate_master_key(
        &self,
        key_pair: &KeyPair,
        password: &str,
    ) -> Result<MasterKeyEntity> {
        let handler = self.handler(key_pair, password).await?;
        self.encryption
            .generate_master_key(EncryptionScheme::Custom(&handler))
            .await
    }

    /// Decrypt a key-pair protected master key.
    ///
    /// # Errors
    /// - `Decryption` if `password` does not open the key pair
    /// - `KeyMismatch` if the master key was encrypted for another key pair
    pub async fn decrypt_master_key_content(
        &self,
        master_key: &MasterKeyEntity,
        key_pair: &KeyPair,
        password: &str,
    ) -> Result<Zeroizing<String>> {
        let handler = self.handler(key_pair, password).await?;
        self.encryption
            .decrypt_master_key_content(master_key, EncryptionScheme::Custom(&handler))
            .await
    }

    /// Move a password protected master key under `target`'s public key.
    ///
    /// No private key or key pair password is needed.
    pub async fn reencrypt_from_password_to_public_key(
        &self,
        master_key: &MasterKeyEntity,
        decryption_password: &str,
        target: &KeyPair,
    ) -> Result<MasterKeyEntity> {
        debug!(master_key_id = %master_key.id, ppk_id = %target.id, "Password -> public key");

        let handler = self.public_key_handler(target)?;
        self.encryption
            .reencrypt_master_key(
                master_key,
                EncryptionScheme::Password(decryption_password),
                EncryptionScheme::Custom(&handler),
            )
            .await
    }

    /// Move a key-pair protected master key under `new_password`.
    pub async fn reencrypt_from_public_key_to_password(
        &self,
        master_key: &MasterKeyEntity,
        decryption_key_pair: &KeyPair,
        decryption_password: &str,
        new_password: &str,
    ) -> Result<MasterKeyEntity> {
        debug!(
            master_key_id = %master_key.id,
            ppk_id = %decryption_key_pair.id,
            "Public key -> password"
        );

        let handler = self.handler(decryption_key_pair, decryption_password).await?;
        self.encryption
            .reencrypt_master_key(
                master_key,
                EncryptionScheme::Custom(&handler),
                EncryptionScheme::Password(new_password),
            )
            .await
    }

    /// Move a key-pair protected master key to another key pair.
    pub async fn reencrypt_master_key(
        &self,
        master_key: &MasterKeyEntity,
        decryption_key_pair: &KeyPair,
        decryption_password: &str,
        target: &KeyPair,
    ) -> Result<MasterKeyEntity> {
        debug!(
            master_key_id = %master_key.id,
            from = %decryption_key_pair.id,
            to = %target.id,
            "Public key -> public key"
        );

        let decrypt_handler = self.handler(decryption_key_pair, decryption_password).await?;
        let encrypt_handler = self.public_key_handler(target)?;
        self.encryption
            .reencrypt_master_key(
                master_key,
                EncryptionScheme::Custom(&decrypt_handler),
                EncryptionScheme::Custom(&encrypt_handler),
            )
            .await
    }
}
