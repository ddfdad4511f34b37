//! Cache backend trait and statistics.
//!
//! Values are opaque strings. Typed access goes through [`CacheBackendExt`],
//! which layers JSON encoding on top of any backend.

use std::time::Duration;

use async_trait::async_trait;
use explore_core::StorageError;
use serde::{de::DeserializeOwned, Serialize};

/// Cache backend trait for pluggable cache implementations.
///
/// This trait abstracts over different cache backends (in-memory, LMDB).
/// Implementations must be thread-safe and support concurrent access; the
/// read-through cache shares one backend across all requests.
///
/// # Expiry
///
/// Every entry is written with a TTL. Once it elapses the entry must read as
/// a miss. Backends may reclaim expired entries lazily.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store a value, replacing any previous value and TTL for `key`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, StorageError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, StorageError>;
}

/// Typed helpers over [`CacheBackend`].
#[async_trait]
pub trait CacheBackendExt: CacheBackend {
    /// Read and decode a JSON value.
    ///
    /// A payload that does not decode as `T` is reported as a serialization error.
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StorageError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                StorageError::Serialization {
                    reason: format!("cached value for {} is not valid: {}", key, e),
                }
            }),
            None => Ok(None),
        }
    }

    /// Encode a value as JSON and store it.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), StorageError>
    where
        T: Serialize + Sync,
    {
        let raw = encode_json(value)?;
        self.set(key, &raw, ttl).await
    }
}

impl<B: CacheBackend + ?Sized> CacheBackendExt for B {}

/// Encode a value the way [`CacheBackendExt::set_json`] stores it.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries currently stored, expired-but-unreclaimed included.
    pub entry_count: u64,
    /// Number of entries reclaimed after their TTL elapsed.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
