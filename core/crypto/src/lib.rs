//! Cryptographic building blocks for PpkVault.
//!
//! This module provides:
//! - Key derivation using Argon2id
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Password-sealed text and master key records
//! - The [`EncryptionService`] with its custom-handler extension point
//! - Asymmetric key handles backed by RSA-OAEP
//!
//! # Security Guarantees
//! - Derived keys and decrypted plaintext are zeroized on drop
//! - No plaintext or key material is ever logged

pub mod aead;
pub mod asymmetric;
pub mod kdf;
pub mod keys;
pub mod master_key;
pub mod method;
pub mod rsa_oaep;
pub mod sealed;
pub mod service;

pub use asymmetric::{AsymmetricHandle, AsymmetricKeyProvider};
pub use kdf::{derive_key, KdfParams};
pub use keys::{DerivedKey, Salt};
pub use master_key::{MasterKeyContent, MasterKeyEntity};
pub use method::EncryptionMethod;
pub use rsa_oaep::{RsaHandle, RsaKeyProvider, RSA_OAEP_SHA256};
pub use service::{
    CustomHandler, EncryptionConfig, EncryptionScheme, EncryptionService,
    StandardEncryptionService,
};
