//! Sync metadata helpers: keeping a key pair attached to the local sync info.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::key_pair::KeyPair;
use crate::service::PpkService;
use ppkvault_common::{Error, KeyId, Result};
use ppkvault_crypto::MasterKeyEntity;

/// Sync metadata shared between devices.
///
/// Only one key pair may be active at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    /// Active key pair, if any.
    #[serde(default)]
    pub ppk: Option<KeyPair>,
    /// Known master keys.
    #[serde(default)]
    pub master_keys: Vec<MasterKeyEntity>,
    /// Master key used for new encryptions.
    #[serde(default)]
    pub active_master_key_id: Option<KeyId>,
}

impl SyncInfo {
    /// The active master key, if set and known.
    pub fn active_master_key(&self) -> Option<&MasterKeyEntity> {
        let id = self.active_master_key_id.as_ref()?;
        self.master_keys.iter().find(|key| &key.id == id)
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

/// Persistence for the local copy of [`SyncInfo`].
#[async_trait]
pub trait SyncInfoStore: Send + Sync {
    /// Load the stored sync info, if any.
    async fn load_local(&self) -> Result<Option<SyncInfo>>;

    /// Replace the stored sync info.
    async fn save_local(&self, info: &SyncInfo) -> Result<()>;
}

/// In-memory store.
///
/// Useful for testing; data is lost on drop.
#[derive(Debug, Default)]
pub struct MemorySyncInfoStore {
    info: RwLock<Option<SyncInfo>>,
    saves: AtomicUsize,
}

impl MemorySyncInfoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save_local` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncInfoStore for MemorySyncInfoStore {
    async fn load_local(&self) -> Result<Option<SyncInfo>> {
        Ok(self.info.read().await.clone())
    }

    async fn save_local(&self, info: &SyncInfo) -> Result<()> {
        *self.info.write().await = Some(info.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store keeping sync info in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSyncInfoStore {
    path: PathBuf,
}

impl JsonFileSyncInfoStore {
    /// Create a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SyncInfoStore for JsonFileSyncInfoStore {
    async fn load_local(&self) -> Result<Option<SyncInfo>> {
        match fs::read_to_string(&self.path).await {
            Ok(json) => SyncInfo::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_local(&self, info: &SyncInfo) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write to a temp file, then rename over the target.
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, info.to_json()?).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), "Saved sync info");
        Ok(())
    }
}

/// Source of cached master key passwords.
pub trait MasterPasswordProvider: Send + Sync {
    /// Password for the master key `master_key_id`, if known.
    fn master_password(&self, master_key_id: &KeyId) -> Option<Zeroizing<String>>;
}

impl<F> MasterPasswordProvider for F
where
    F: Fn(&KeyId) -> Option<String> + Send + Sync,
{
    fn master_password(&self, master_key_id: &KeyId) -> Option<Zeroizing<String>> {
        self(master_key_id).map(Zeroizing::new)
    }
}

impl MasterPasswordProvider for HashMap<KeyId, String> {
    fn master_password(&self, master_key_id: &KeyId) -> Option<Zeroizing<String>> {
        self.get(master_key_id).cloned().map(Zeroizing::new)
    }
}

/// Result of [`PpkService::ensure_exists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A new key pair was generated and saved.
    Generated(KeyPair),
    /// The local or remote sync info already has a key pair.
    AlreadyExists,
    /// There is no active master key whose password could protect a pair.
    NoActiveMasterKey,
    /// The active master key's password is not available.
    NoPassword,
}

impl PpkService {
    /// Generate a key pair, attach it to `local_info` and save it.
    ///
    /// Any key pair already attached is replaced.
    pub async fn generate_and_save(
        &self,
        local_info: &mut SyncInfo,
        password: &str,
        store: &dyn SyncInfoStore,
    ) -> Result<KeyPair> {
        let key_pair = self.generate_key_pair(password).await?;

        let previous = local_info.ppk.replace(key_pair.clone());
        if let Some(previous) = &previous {
            warn!(
                previous = %previous.id,
                replacement = %key_pair.id,
                "Replacing existing key pair"
            );
        }

        if let Err(e) = store.save_local(local_info).await {
            local_info.ppk = previous;
            return Err(e);
        }

        info!(ppk_id = %key_pair.id, "Saved key pair to sync info");
        Ok(key_pair)
    }

    /// Generate and save a key pair unless one exists or cannot be protected.
    ///
    /// The new pair is sealed with the password of the active master key.
    pub async fn ensure_exists(
        &self,
        local_info: &mut SyncInfo,
        remote_info: &SyncInfo,
        passwords: &dyn MasterPasswordProvider,
        store: &dyn SyncInfoStore,
    ) -> Result<EnsureOutcome> {
        if local_info.ppk.is_some() || remote_info.ppk.is_some() {
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let Some(master_key_id) = local_info.active_master_key().map(|key| key.id.clone()) else {
            return Ok(EnsureOutcome::NoActiveMasterKey);
        };

        let Some(password) = passwords.master_password(&master_key_id) else {
            debug!(master_key_id = %master_key_id, "No password for active master key");
            return Ok(EnsureOutcome::NoPassword);
        };

        let key_pair = self.generate_and_save(local_info, &password, store).await?;
        Ok(EnsureOutcome::Generated(key_pair))
    }
}
