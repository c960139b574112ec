//! Key storage module.
//!
//! This module provides a name-indexed store for encrypted key containers,
//! with an in-memory and a filesystem backend, a timeout/cancellation
//! wrapper, and the key management functions built on top of them.
//!
//! Names are `/`-rooted paths such as `/privKeys/alice`.

pub mod fs;
pub mod guarded;
pub mod keystore;
pub mod memory;

use crate::error::{PeerKeyError, Result};
use async_trait::async_trait;

pub use fs::FsKeyStore;
pub use guarded::GuardedKeyStore;
pub use memory::MemoryKeyStore;

/// Namespace holding private key containers.
pub const PRIV_KEYS_PREFIX: &str = "/privKeys";

/// One operation in a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Write, replacing any existing value
    Put { name: String, value: Vec<u8> },
    /// Write only if nothing is stored under the name yet
    PutNew { name: String, value: Vec<u8> },
    /// Remove; absent names are ignored
    Delete { name: String },
}

impl BatchOp {
    pub fn name(&self) -> &str {
        match self {
            BatchOp::Put { name, .. } | BatchOp::PutNew { name, .. } | BatchOp::Delete { name } => {
                name
            }
        }
    }
}

/// A set of writes applied together by [`KeyStore::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: impl Into<String>, value: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            name: name.into(),
            value,
        });
        self
    }

    /// Create-only write; the commit fails with `AlreadyExists` if the
    /// name is taken when the batch is applied.
    pub fn put_new(&mut self, name: impl Into<String>, value: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::PutNew {
            name: name.into(),
            value,
        });
        self
    }

    pub fn delete(&mut self, name: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Delete { name: name.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    /// Check every name in the batch.
    pub fn validate(&self) -> Result<()> {
        self.ops.iter().try_for_each(|op| validate_name(op.name()))
    }
}

/// Name-indexed persistent byte store.
///
/// Each name holds at most one value. `commit` applies a batch entirely or
/// not at all.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Whether a value is stored under `name`.
    async fn has(&self, name: &str) -> Result<bool>;

    /// The value stored under `name`, or `NotFound`.
    async fn get(&self, name: &str) -> Result<Vec<u8>>;

    /// Start an empty batch.
    fn batch(&self) -> Batch {
        Batch::new()
    }

    /// Apply all operations of `batch`.
    async fn commit(&self, batch: Batch) -> Result<()>;

    /// All stored names under `prefix`, sorted.
    async fn list_names(&self, prefix: &str) -> Result<Vec<String>>;

    async fn put(&self, name: &str, value: Vec<u8>) -> Result<()> {
        let mut batch = self.batch();
        batch.put(name, value);
        self.commit(batch).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut batch = self.batch();
        batch.delete(name);
        self.commit(batch).await
    }
}

/// Check that `name` is a `/`-rooted path of plain segments.
///
/// Segments are non-empty, use only ASCII letters, digits and `-_.@+=`,
/// and never start with a dot. Only the last segment may end in `.data`.
pub fn validate_name(name: &str) -> Result<()> {
    let rest = name
        .strip_prefix('/')
        .ok_or_else(|| PeerKeyError::InvalidKeyName(format!("'{}' must start with '/'", name)))?;

    let segments: Vec<&str> = rest.split('/').collect();
    for (index, segment) in segments.iter().enumerate() {
        // A directory named like an entry file would shadow that entry on disk
        if index + 1 < segments.len() && segment.ends_with(".data") {
            return Err(PeerKeyError::InvalidKeyName(format!(
                "'{}' has an inner segment ending in '.data'",
                name
            )));
        }
        if segment.is_empty() {
            return Err(PeerKeyError::InvalidKeyName(format!(
                "'{}' contains an empty segment",
                name
            )));
        }
        if segment.starts_with('.') {
            return Err(PeerKeyError::InvalidKeyName(format!(
                "'{}' contains a segment starting with '.'",
                name
            )));
        }
        if let Some(c) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || "-_.@+=".contains(*c)))
        {
            return Err(PeerKeyError::InvalidKeyName(format!(
                "'{}' contains invalid character {:?}",
                name, c
            )));
        }
    }
    Ok(())
}

/// Whether `name` lies under `prefix` (as a path, not a string prefix).
pub fn name_matches_prefix(name: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    name == prefix
        || name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
