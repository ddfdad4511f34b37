//! Process-local cache backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use explore_core::StorageError;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::traits::{CacheBackend, CacheStats};

/// Minimum spacing between full sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    /// `None` until the first write schedules a sweep.
    next_sweep: Option<Instant>,
}

impl Entries {
    /// Drop every entry whose TTL has elapsed. Returns how many were dropped.
    fn sweep(&mut self, now: Instant) -> u64 {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.expires_at > now);
        self.next_sweep = Some(now + SWEEP_INTERVAL);
        (before - self.map.len()) as u64
    }

    fn sweep_due(&self, now: Instant) -> bool {
        self.next_sweep.map_or(true, |at| now >= at)
    }
}

/// In-memory cache with per-entry TTL.
///
/// Expiry uses `tokio::time::Instant`, so tests can drive it with a paused clock.
/// An expired entry is dropped when a read finds it, and writes sweep the whole
/// map at most once per [`SWEEP_INTERVAL`], so keys that are never read again
/// do not accumulate.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all expired entries now. Returns how many were dropped.
    pub async fn purge_expired(&self) -> u64 {
        let purged = self.entries.write().await.sweep(Instant::now());
        self.evictions.fetch_add(purged, Ordering::Relaxed);
        purged
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: reclaim unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().await;
        if entries
            .map
            .get(key)
            .map(|entry| entry.expires_at <= now)
            .unwrap_or(false)
        {
            entries.map.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now + ttl,
        };

        let mut entries = self.entries.write().await;
        if entries.sweep_due(now) {
            let swept = entries.sweep(now);
            if swept > 0 {
                self.evictions.fetch_add(swept, Ordering::Relaxed);
                tracing::debug!(swept, "swept expired cache entries");
            }
        }
        entries.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StorageError> {
        let mut entries = self.entries.write().await;
        let deleted = keys
            .iter()
            .filter(|key| entries.map.remove(key.as_str()).is_some())
            .count();
        Ok(deleted as u64)
    }

    async fn stats(&self) -> Result<CacheStats, StorageError> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.read().await.map.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
