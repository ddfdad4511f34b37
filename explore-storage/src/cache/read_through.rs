//! Read-through cache with detached repopulation.
//!
//! Reads consult the backend first. Any backend fault is downgraded to a miss
//! so the caller falls through to storage. After a storage read the caller
//! hands the result back through one of the `repopulate_*` methods, which
//! spawn a detached task to write it.
//!
//! Repopulation is fire-and-forget: the caller never learns whether the write
//! happened, a failed write is logged and dropped, and the task is not
//! cancelled when the request that triggered it goes away.

use std::sync::Arc;
use std::time::Duration;

use explore_core::{CacheKey, QueryKind, StorageError};
use serde::{de::DeserializeOwned, Serialize};

use super::traits::{encode_json, CacheBackend, CacheBackendExt};

/// Time-to-live per query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub likers: Duration,
    pub new_likers: Duration,
    pub count: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            likers: Duration::from_secs(30),
            new_likers: Duration::from_secs(20),
            count: Duration::from_secs(15),
        }
    }
}

impl CacheTtls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_likers(mut self, ttl: Duration) -> Self {
        self.likers = ttl;
        self
    }

    pub fn with_new_likers(mut self, ttl: Duration) -> Self {
        self.new_likers = ttl;
        self
    }

    pub fn with_count(mut self, ttl: Duration) -> Self {
        self.count = ttl;
        self
    }

    /// TTL for entries of the given query shape.
    pub fn for_kind(&self, kind: QueryKind) -> Duration {
        match kind {
            QueryKind::Likers => self.likers,
            QueryKind::NewLikers => self.new_likers,
            QueryKind::LikersCount => self.count,
        }
    }
}

/// Cache-aside accelerator over an injected backend.
#[derive(Clone)]
pub struct ReadThroughCache {
    backend: Arc<dyn CacheBackend>,
    ttls: CacheTtls,
}

impl ReadThroughCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttls: CacheTtls) -> Self {
        Self { backend, ttls }
    }

    pub fn with_defaults(backend: Arc<dyn CacheBackend>) -> Self {
        Self::new(backend, CacheTtls::default())
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Decoded cached value for `key`. `None` on miss or on any backend fault.
    ///
    /// A payload that no longer decodes as `T` counts as a miss.
    pub async fn lookup<T: DeserializeOwned + Send>(&self, key: &CacheKey) -> Option<T> {
        match self.backend.get_json::<T>(key.as_str()).await {
            Ok(value) => {
                tracing::trace!(key = %key, hit = value.is_some(), "cache lookup");
                value
            }
            Err(StorageError::Serialization { reason }) => {
                tracing::warn!(key = %key, error = %reason, "cached payload undecodable, treating as miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Serialize `value` now and write it in a detached task.
    pub fn repopulate_json<T: Serialize>(&self, key: CacheKey, value: &T, ttl: Duration) {
        match encode_json(value) {
            Ok(raw) => self.repopulate_raw(key, raw, ttl),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to serialize cache entry");
            }
        }
    }

    /// Write `value` under `key` in a detached task.
    pub fn repopulate_raw(&self, key: CacheKey, value: String, ttl: Duration) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.set(key.as_str(), &value, ttl).await {
                tracing::warn!(key = %key, error = %e, "failed to set cache");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheBackend;
    use async_trait::async_trait;
    use explore_core::StorageError;

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::unavailable("connection refused"))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StorageError> {
            Err(StorageError::unavailable("connection refused"))
        }

        async fn delete(&self, _keys: &[String]) -> Result<u64, StorageError> {
            Err(StorageError::unavailable("connection refused"))
        }

        async fn stats(&self) -> Result<crate::cache::CacheStats, StorageError> {
            Err(StorageError::unavailable("connection refused"))
        }
    }

    async fn wait_for_value(backend: &InMemoryCacheBackend, key: &str) -> Option<String> {
        for _ in 0..100 {
            if let Some(value) = backend.get(key).await.unwrap() {
                return Some(value);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[test]
    fn test_default_ttls() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.for_kind(QueryKind::Likers), Duration::from_secs(30));
        assert_eq!(ttls.for_kind(QueryKind::NewLikers), Duration::from_secs(20));
        assert_eq!(ttls.for_kind(QueryKind::LikersCount), Duration::from_secs(15));

        let custom = CacheTtls::new().with_count(Duration::from_secs(1));
        assert_eq!(custom.count, Duration::from_secs(1));
        assert_eq!(custom.likers, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_repopulate_then_lookup() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = ReadThroughCache::with_defaults(backend.clone());
        let key = CacheKey::likers_count("user123");

        assert_eq!(cache.lookup::<u64>(&key).await, None);

        cache.repopulate_raw(key.clone(), "3".to_string(), Duration::from_secs(15));
        assert_eq!(wait_for_value(&backend, key.as_str()).await.as_deref(), Some("3"));
        assert_eq!(cache.lookup::<u64>(&key).await, Some(3));
    }

    #[tokio::test]
    async fn test_backend_faults_are_misses() {
        let cache = ReadThroughCache::with_defaults(Arc::new(FailingBackend));
        let key = CacheKey::likers("user123", "");

        assert_eq!(cache.lookup::<u64>(&key).await, None);
        assert_eq!(cache.lookup::<Vec<String>>(&key).await, None);

        // Write failure is swallowed by the detached task.
        cache.repopulate_json(key, &vec!["a".to_string()], Duration::from_secs(30));
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        backend
            .set("likers:user123:", "not json", Duration::from_secs(30))
            .await
            .unwrap();

        let cache = ReadThroughCache::with_defaults(backend);
        let value: Option<Vec<String>> = cache.lookup(&CacheKey::likers("user123", "")).await;
        assert_eq!(value, None);
    }
}
