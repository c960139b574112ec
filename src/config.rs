//! Keystore configuration.
//!
//! A JSON file tells the embedding process where the keystore lives, how long
//! a store operation may take, and which options new containers use:
//!
//! ```json
//! {
//!   "path": "/var/lib/peer/keystore",
//!   "io_timeout_ms": 5000,
//!   "encryption": { "algorithm": "aes256", "iteration_count": 10000 }
//! }
//! ```
//!
//! Every field but `path` is optional.

use crate::container::EncryptionOptions;
use crate::error::{PeerKeyError, Result};
use crate::storage::{FsKeyStore, GuardedKeyStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Settings for opening a filesystem keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreConfig {
    /// Root directory of the keystore
    pub path: PathBuf,

    /// Per-operation timeout; none means operations may take as long as they need
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_timeout_ms: Option<u64>,

    /// Options for newly stored keys
    #[serde(default)]
    pub encryption: EncryptionOptions,
}

impl KeystoreConfig {
    /// Configuration with default options for a keystore at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_timeout_ms: None,
            encryption: EncryptionOptions::default(),
        }
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PeerKeyError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: KeystoreConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(PeerKeyError::Config("keystore path is empty".to_string()));
        }
        if self.io_timeout_ms == Some(0) {
            return Err(PeerKeyError::Config(
                "io_timeout_ms must be positive when set".to_string(),
            ));
        }
        self.encryption.validate()
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }

    /// Open the configured filesystem store with a fresh cancellation token.
    pub async fn open_store(&self) -> Result<GuardedKeyStore<FsKeyStore>> {
        self.open_store_with_token(CancellationToken::new()).await
    }

    /// Open the configured filesystem store, cancelled together with `token`.
    pub async fn open_store_with_token(
        &self,
        token: CancellationToken,
    ) -> Result<GuardedKeyStore<FsKeyStore>> {
        self.validate()?;
        let store = GuardedKeyStore::new(FsKeyStore::open(&self.path).await?).with_token(token);
        Ok(match self.io_timeout() {
            Some(timeout) => store.with_timeout(timeout),
            None => store,
        })
    }
}
