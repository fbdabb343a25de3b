//! Public/private key pairs for PpkVault.
//!
//! This module provides:
//! - Key pair generation with the private half sealed under a password
//! - Loading and password validation of stored key pairs
//! - A custom handler that lets master keys be protected by a key pair
//! - Master key re-encryption between password and key pair protection
//! - Sync metadata helpers that keep a key pair available
//!
//! # Architecture
//! [`PpkService`] sits on top of the encryption service and an asymmetric
//! key provider. It never holds key material between calls.

pub mod config;
pub mod handler;
pub mod key_pair;
pub mod master_key;
pub mod service;
pub mod sync_info;

pub use config::PpkConfig;
pub use handler::{Envelope, PpkHandler};
pub use key_pair::{EncryptedPrivateKey, KeyPair};
pub use service::PpkService;
pub use sync_info::{
    EnsureOutcome, JsonFileSyncInfoStore, MasterPasswordProvider, MemorySyncInfoStore, SyncInfo,
    SyncInfoStore,
};
