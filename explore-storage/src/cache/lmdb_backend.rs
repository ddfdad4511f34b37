//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store that survives process restarts, so a redeployed instance
//! starts with a warm cache.
//!
//! # Layout
//!
//! Two named databases in one environment:
//! - `entries`: `key -> [expires_at: 8 bytes, millis since epoch, LE][utf8 value]`
//! - `expiry`: `[expires_at: 8 bytes, BE][key] -> ()`, ordered soonest first
//!
//! Both are updated in the same write transaction. Expired entries read as
//! misses and are deleted on the read that finds them. Entries that are never
//! read again are purged by walking `expiry` up to the first live entry, which
//! every [`SWEEP_EVERY_WRITES`]th write does, and which a write that finds the
//! map full does before retrying once.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use explore_core::StorageError;
use heed::types::{Bytes, Unit};
use heed::{Database, Env, EnvOpenOptions, MdbError, RwTxn};

use super::traits::{CacheBackend, CacheStats};

const EXPIRY_PREFIX_LEN: usize = 8;

/// Writes between purges of expired entries.
const SWEEP_EVERY_WRITES: u64 = 64;

const ENTRIES_DB: &str = "entries";
const EXPIRY_DB: &str = "expiry";

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes are not in the expected layout.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbCacheError {
    fn from(e: heed::Error) -> Self {
        LmdbCacheError::Transaction(e.to_string())
    }
}

impl From<LmdbCacheError> for StorageError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Corrupt(reason) => StorageError::Serialization { reason },
            other => StorageError::unavailable(other.to_string()),
        }
    }
}

enum Lookup {
    Hit(String),
    Expired,
    Missing,
}

/// LMDB-backed cache with per-entry TTL.
///
/// # Example
///
/// ```ignore
/// use explore_storage::cache::{CacheBackend, LmdbCacheBackend};
///
/// let backend = LmdbCacheBackend::new("/var/cache/explore", 256)?;
/// backend.set("likerscount:user123", "3", Duration::from_secs(15)).await?;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// Cached values, prefixed with their expiry.
    entries: Database<Bytes, Bytes>,
    /// Expiry index over `entries`.
    expiry: Database<Bytes, Unit>,
    /// Hit/miss/eviction counters. `entry_count` is read from LMDB on demand.
    stats: RwLock<CacheStats>,
    /// Writes since open; every `SWEEP_EVERY_WRITES`th one purges.
    writes: AtomicU64,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(2)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn()?;

        let entries: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(ENTRIES_DB))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        let expiry: Database<Bytes, Unit> = env
            .create_database(&mut wtxn, Some(EXPIRY_DB))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()?;

        Ok(Self {
            env,
            entries,
            expiry,
            stats: RwLock::new(CacheStats::default()),
            writes: AtomicU64::new(0),
        })
    }

    fn record(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            f(&mut stats);
        }
    }

    fn expires_at(ttl: Duration) -> i64 {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Utc::now().timestamp_millis().saturating_add(ttl_millis)
    }

    fn encode_entry(value: &str, expires_at: i64) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(EXPIRY_PREFIX_LEN + value.len());
        bytes.extend_from_slice(&expires_at.to_le_bytes());
        bytes.extend_from_slice(value.as_bytes());
        bytes
    }

    fn entry_expiry(bytes: &[u8]) -> Option<i64> {
        let prefix: [u8; EXPIRY_PREFIX_LEN] = bytes.get(..EXPIRY_PREFIX_LEN)?.try_into().ok()?;
        Some(i64::from_le_bytes(prefix))
    }

    /// Index key ordering entries by expiry. Pre-epoch expiries clamp to zero.
    fn index_key(expires_at: i64, key: &[u8]) -> Vec<u8> {
        let order = u64::try_from(expires_at).unwrap_or(0);
        let mut bytes = Vec::with_capacity(EXPIRY_PREFIX_LEN + key.len());
        bytes.extend_from_slice(&order.to_be_bytes());
        bytes.extend_from_slice(key);
        bytes
    }

    fn split_index_key(bytes: &[u8]) -> Option<(i64, &[u8])> {
        let prefix: [u8; EXPIRY_PREFIX_LEN] = bytes.get(..EXPIRY_PREFIX_LEN)?.try_into().ok()?;
        let expires_at = i64::try_from(u64::from_be_bytes(prefix)).unwrap_or(i64::MAX);
        Some((expires_at, &bytes[EXPIRY_PREFIX_LEN..]))
    }

    fn decode_entry(bytes: &[u8], now_millis: i64) -> Result<Lookup, LmdbCacheError> {
        let expires_at = Self::entry_expiry(bytes)
            .ok_or_else(|| LmdbCacheError::Corrupt("entry shorter than expiry prefix".into()))?;
        if expires_at <= now_millis {
            return Ok(Lookup::Expired);
        }

        let value = std::str::from_utf8(&bytes[EXPIRY_PREFIX_LEN..])
            .map_err(|e| LmdbCacheError::Corrupt(e.to_string()))?;
        Ok(Lookup::Hit(value.to_string()))
    }

    fn lookup(&self, key: &str) -> Result<Lookup, LmdbCacheError> {
        let rtxn = self.env.read_txn()?;
        match self.entries.get(&rtxn, key.as_bytes())? {
            Some(bytes) => Self::decode_entry(bytes, Utc::now().timestamp_millis()),
            None => Ok(Lookup::Missing),
        }
    }

    /// Remove `key` and its index entry inside `wtxn`. Returns whether it existed.
    fn remove_in(&self, wtxn: &mut RwTxn, key: &[u8]) -> heed::Result<bool> {
        let previous = self.entries.get(wtxn, key)?.and_then(Self::entry_expiry);
        if let Some(expires_at) = previous {
            self.expiry.delete(wtxn, &Self::index_key(expires_at, key))?;
        }
        self.entries.delete(wtxn, key)
    }

    /// Write one entry and its index entry, keeping the raw heed error.
    fn write_entry(&self, key: &str, expires_at: i64, bytes: &[u8]) -> heed::Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.remove_in(&mut wtxn, key.as_bytes())?;
        self.entries.put(&mut wtxn, key.as_bytes(), bytes)?;
        self.expiry
            .put(&mut wtxn, &Self::index_key(expires_at, key.as_bytes()), &())?;
        wtxn.commit()
    }

    /// Delete `key` if it is still expired. Returns whether it was removed.
    fn reclaim_expired(&self, key: &str) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn()?;

        let still_expired = match self.entries.get(&wtxn, key.as_bytes())? {
            Some(bytes) => matches!(
                Self::decode_entry(bytes, Utc::now().timestamp_millis()),
                Ok(Lookup::Expired)
            ),
            None => false,
        };

        let removed = still_expired && self.remove_in(&mut wtxn, key.as_bytes())?;
        wtxn.commit()?;
        Ok(removed)
    }

    /// Delete every entry whose TTL has elapsed. Returns how many were removed.
    ///
    /// Walks the expiry index from the soonest expiry and stops at the first
    /// live entry, so the cost tracks the number of expired entries.
    pub fn purge_expired(&self) -> Result<u64, LmdbCacheError> {
        let now_millis = Utc::now().timestamp_millis();
        let mut wtxn = self.env.write_txn()?;

        let mut due = Vec::new();
        for result in self.expiry.iter(&wtxn)? {
            let (index_key, ()) = result?;
            match Self::split_index_key(index_key) {
                Some((expires_at, _)) if expires_at > now_millis => break,
                _ => due.push(index_key.to_vec()),
            }
        }

        let mut removed = 0u64;
        for index_key in &due {
            self.expiry.delete(&mut wtxn, index_key)?;
            let Some((expires_at, key)) = Self::split_index_key(index_key) else {
                continue;
            };
            // Only drop the entry the index row describes.
            let current = self.entries.get(&wtxn, key)?.and_then(Self::entry_expiry);
            if current == Some(expires_at) && self.entries.delete(&mut wtxn, key)? {
                removed += 1;
            }
        }

        wtxn.commit()?;
        self.record(|s| s.evictions += removed);
        Ok(removed)
    }

    fn sweep_if_due(&self) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY_WRITES != 0 {
            return;
        }
        match self.purge_expired() {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "swept expired LMDB cache entries"),
            Err(e) => tracing::warn!(error = %e, "LMDB cache sweep failed"),
        }
    }
}

fn is_map_full(e: &heed::Error) -> bool {
    matches!(e, heed::Error::Mdb(MdbError::MapFull))
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.lookup(key) {
            Ok(Lookup::Hit(value)) => {
                self.record(|s| s.hits += 1);
                Ok(Some(value))
            }
            Ok(Lookup::Missing) => {
                self.record(|s| s.misses += 1);
                Ok(None)
            }
            Ok(Lookup::Expired) => {
                self.record(|s| s.misses += 1);
                if self.reclaim_expired(key)? {
                    self.record(|s| s.evictions += 1);
                }
                Ok(None)
            }
            Err(e) => {
                self.record(|s| s.misses += 1);
                Err(e.into())
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        self.sweep_if_due();

        let expires_at = Self::expires_at(ttl);
        let bytes = Self::encode_entry(value, expires_at);

        match self.write_entry(key, expires_at, &bytes) {
            Ok(()) => Ok(()),
            Err(e) if is_map_full(&e) => {
                let purged = self.purge_expired()?;
                tracing::info!(purged, "LMDB cache map full, purged expired entries");
                self.write_entry(key, expires_at, &bytes)
                    .map_err(|e| StorageError::from(LmdbCacheError::from(e)))
            }
            Err(e) => Err(LmdbCacheError::from(e).into()),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StorageError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbCacheError::from)?;

        let mut deleted = 0u64;
        for key in keys {
            if self
                .remove_in(&mut wtxn, key.as_bytes())
                .map_err(LmdbCacheError::from)?
            {
                deleted += 1;
            }
        }

        wtxn.commit().map_err(LmdbCacheError::from)?;
        Ok(deleted)
    }

    async fn stats(&self) -> Result<CacheStats, StorageError> {
        let rtxn = self.env.read_txn().map_err(LmdbCacheError::from)?;
        let entry_count = self.entries.len(&rtxn).map_err(LmdbCacheError::from)?;

        let mut stats = self.stats.read().map(|s| s.clone()).unwrap_or_default();
        stats.entry_count = entry_count;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_backend() -> (LmdbCacheBackend, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let backend =
            LmdbCacheBackend::new(temp_dir.path(), 10).expect("backend creation should succeed");
        (backend, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (backend, _temp_dir) = create_test_backend();

        backend
            .set("likers:user123:", "{\"likers\":[]}", Duration::from_secs(30))
            .await
            .expect("set should succeed");

        let cached = backend
            .get("likers:user123:")
            .await
            .expect("get should succeed");
        assert_eq!(cached.as_deref(), Some("{\"likers\":[]}"));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (backend, _temp_dir) = create_test_backend();
        let cached = backend.get("missing").await.expect("get should succeed");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_reclaimed() {
        let (backend, _temp_dir) = create_test_backend();

        backend
            .set("k", "v", Duration::ZERO)
            .await
            .expect("set should succeed");

        let cached = backend.get("k").await.expect("get should succeed");
        assert!(cached.is_none());

        let stats = backend.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 0);

        // The index row went with it.
        assert_eq!(backend.purge_expired().expect("purge should succeed"), 0);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (backend, _temp_dir) = create_test_backend();

        backend.set("k", "1", Duration::from_secs(15)).await.unwrap();
        backend.set("k", "2", Duration::from_secs(15)).await.unwrap();

        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(backend.stats().await.unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (backend, _temp_dir) = create_test_backend();

        backend.set("a", "1", Duration::from_secs(15)).await.unwrap();
        backend.set("b", "2", Duration::from_secs(15)).await.unwrap();

        let deleted = backend
            .delete(&["a".to_string(), "c".to_string()])
            .await
            .expect("delete should succeed");
        assert_eq!(deleted, 1);
        assert!(backend.get("a").await.unwrap().is_none());
        assert!(backend.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let (backend, _temp_dir) = create_test_backend();

        let _ = backend.get("k").await;
        backend.set("k", "v", Duration::from_secs(15)).await.unwrap();
        let _ = backend.get("k").await;
        let _ = backend.get("k").await;

        let stats = backend.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_entries() {
        let (backend, _temp_dir) = create_test_backend();

        backend.set("live", "v", Duration::from_secs(3600)).await.unwrap();
        for page in 0..3 {
            backend
                .set(&format!("likers:R:{}", page), "{}", Duration::ZERO)
                .await
                .unwrap();
        }
        assert_eq!(backend.stats().await.unwrap().entry_count, 4);

        assert_eq!(backend.purge_expired().expect("purge should succeed"), 3);

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.evictions, 3);
        assert_eq!(backend.get("live").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_refreshed_entry_survives_purge() {
        let (backend, _temp_dir) = create_test_backend();

        backend.set("k", "old", Duration::ZERO).await.unwrap();
        backend.set("k", "new", Duration::from_secs(3600)).await.unwrap();

        assert_eq!(backend.purge_expired().expect("purge should succeed"), 0);
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_unread_expired_entries_do_not_fill_the_map() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let backend =
            LmdbCacheBackend::new(temp_dir.path(), 1).expect("backend creation should succeed");
        backend.set("live", "v", Duration::from_secs(3600)).await.unwrap();

        // Several times more dead payload than a 1 MB map holds, never read back.
        let payload = "x".repeat(2000);
        for page in 0..2000 {
            backend
                .set(&format!("likers:R:{}", page), &payload, Duration::ZERO)
                .await
                .unwrap_or_else(|e| panic!("write {} failed: {}", page, e));
        }

        let stats = backend.stats().await.unwrap();
        assert!(stats.evictions > 0);
        assert!(stats.entry_count <= SWEEP_EVERY_WRITES + 1);
        assert_eq!(backend.get("live").await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_corrupt_entry_is_rejected() {
        let result = LmdbCacheBackend::decode_entry(&[1, 2, 3], 0);
        assert!(matches!(result, Err(LmdbCacheError::Corrupt(_))));
    }

    #[test]
    fn test_index_orders_by_expiry() {
        let soon = LmdbCacheBackend::index_key(1_000, b"zzz");
        let later = LmdbCacheBackend::index_key(2_000, b"aaa");
        assert!(soon < later);
        assert_eq!(
            LmdbCacheBackend::split_index_key(&later),
            Some((2_000, &b"aaa"[..]))
        );
    }
}
