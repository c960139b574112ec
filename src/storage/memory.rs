//! In-memory key store.
//!
//! Used for tests and for callers that keep keys only for the life of the
//! process.

use super::{name_matches_prefix, validate_name, Batch, BatchOp, KeyStore};
use crate::error::{PeerKeyError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key store backed by a `BTreeMap` behind a tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn has(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.entries.read().await.contains_key(name))
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        self.entries
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| PeerKeyError::NotFound(format!("No entry stored under '{}'", name)))
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        batch.validate()?;
        let mut entries = self.entries.write().await;

        // Check create-only writes against the state each one will see.
        let mut pending: HashMap<&str, bool> = HashMap::new();
        for op in batch.ops() {
            let name = op.name();
            let exists = pending
                .get(name)
                .copied()
                .unwrap_or_else(|| entries.contains_key(name));
            match op {
                BatchOp::PutNew { .. } if exists => {
                    return Err(PeerKeyError::AlreadyExists(format!(
                        "An entry is already stored under '{}'",
                        name
                    )))
                }
                BatchOp::Put { .. } | BatchOp::PutNew { .. } => {
                    pending.insert(name, true);
                }
                BatchOp::Delete { .. } => {
                    pending.insert(name, false);
                }
            }
        }

        for op in batch.into_ops() {
            match op {
                BatchOp::Put { name, value } | BatchOp::PutNew { name, value } => {
                    entries.insert(name, value);
                }
                BatchOp::Delete { name } => {
                    entries.remove(&name);
                }
            }
        }
        Ok(())
    }

    async fn list_names(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|name| name_matches_prefix(name, prefix))
            .cloned()
            .collect())
    }
}
