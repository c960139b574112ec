//! Timeout and cancellation for store operations.
//!
//! [`GuardedKeyStore`] wraps any [`KeyStore`] so that each operation gives
//! up after a fixed timeout or as soon as a `CancellationToken` fires.
//! Either outcome is reported as [`PeerKeyError::Cancelled`].

use super::{Batch, KeyStore};
use crate::error::{PeerKeyError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A key store whose operations honour a timeout and a cancellation token.
#[derive(Debug)]
pub struct GuardedKeyStore<S> {
    inner: S,
    timeout: Option<Duration>,
    token: CancellationToken,
}

impl<S: KeyStore> GuardedKeyStore<S> {
    /// Wrap `inner` with no timeout and a fresh token.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            timeout: None,
            token: CancellationToken::new(),
        }
    }

    /// Give up on any single operation after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use an externally owned token, e.g. a child of a shutdown token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// A clone of the token; cancelling it aborts pending and future operations.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn guard<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        if self.token.is_cancelled() {
            warn!(operation, "Store operation refused, token cancelled");
            return Err(PeerKeyError::Cancelled(format!("{} cancelled", operation)));
        }

        let bounded = async {
            match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, future).await.map_err(|_| {
                    warn!(
                        operation,
                        timeout_ms = timeout.as_millis() as u64,
                        "Store operation timed out"
                    );
                    PeerKeyError::Cancelled(format!(
                        "{} timed out after {:?}",
                        operation, timeout
                    ))
                })?,
                None => future.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                warn!(operation, "Store operation cancelled");
                Err(PeerKeyError::Cancelled(format!("{} cancelled", operation)))
            }
            result = bounded => result,
        }
    }
}

#[async_trait]
impl<S: KeyStore> KeyStore for GuardedKeyStore<S> {
    async fn has(&self, name: &str) -> Result<bool> {
        self.guard("has", self.inner.has(name)).await
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.guard("get", self.inner.get(name)).await
    }

    fn batch(&self) -> Batch {
        self.inner.batch()
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        self.guard("commit", self.inner.commit(batch)).await
    }

    async fn list_names(&self, prefix: &str) -> Result<Vec<String>> {
        self.guard("list_names", self.inner.list_names(prefix)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyStore;

    /// A store whose reads never finish.
    struct StalledStore;

    #[async_trait]
    impl KeyStore for StalledStore {
        async fn has(&self, _name: &str) -> Result<bool> {
            std::future::pending().await
        }

        async fn get(&self, _name: &str) -> Result<Vec<u8>> {
            std::future::pending().await
        }

        async fn commit(&self, _batch: Batch) -> Result<()> {
            std::future::pending().await
        }

        async fn list_names(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_passes_through() {
        let store =
            GuardedKeyStore::new(MemoryKeyStore::new()).with_timeout(Duration::from_secs(5));
        store.put("/privKeys/a", vec![1]).await.unwrap();
        assert!(store.has("/privKeys/a").await.unwrap());
        assert_eq!(store.get("/privKeys/a").await.unwrap(), vec![1]);
        assert_eq!(store.list_names("/privKeys").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inner_errors_unchanged() {
        let store = GuardedKeyStore::new(MemoryKeyStore::new());
        match store.get("/privKeys/missing").await {
            Err(PeerKeyError::NotFound(_)) => {}
            _ => panic!("Expected NotFound"),
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_cancelled() {
        let store = GuardedKeyStore::new(StalledStore).with_timeout(Duration::from_millis(20));
        match store.get("/privKeys/a").await {
            Err(PeerKeyError::Cancelled(msg)) => assert!(msg.contains("timed out")),
            _ => panic!("Expected Cancelled"),
        }
    }

    #[tokio::test]
    async fn test_token_cancels_pending_operation() {
        let store = GuardedKeyStore::new(StalledStore);
        let token = store.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        match store.has("/privKeys/a").await {
            Err(PeerKeyError::Cancelled(_)) => {}
            _ => panic!("Expected Cancelled"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_refuses_new_operations() {
        let token = CancellationToken::new();
        let store = GuardedKeyStore::new(MemoryKeyStore::new()).with_token(token.child_token());
        token.cancel();

        let result = store.put("/privKeys/a", vec![1]).await;
        assert!(matches!(result, Err(PeerKeyError::Cancelled(_))));
        assert!(store.inner().is_empty().await);
    }
}
