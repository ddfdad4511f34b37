//! Explore Test Utilities
//!
//! Shared test infrastructure for the Explore workspace:
//! - Instrumented fakes for the decision store and cache backend
//! - Proptest generators for identifiers, cursors and timestamps
//! - Fixtures for laying out likers at known timestamps

pub use explore_core::{Cursor, Liker, PageCursor, StorageError, DEFAULT_PAGE_LIMIT};
pub use explore_storage::{
    CacheBackend, CacheStats, DecisionStore, InMemoryCacheBackend, LikersPage,
    MemoryDecisionStore,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// INSTRUMENTED DECISION STORE
// ============================================================================

/// Per-operation call counts.
#[derive(Debug, Default)]
pub struct StoreCalls {
    pub get_likers: AtomicUsize,
    pub get_new_likers: AtomicUsize,
    pub count_likes: AtomicUsize,
    pub upsert_decision: AtomicUsize,
    pub has_mutual_like: AtomicUsize,
}

impl StoreCalls {
    /// Calls that read the decision relation for a list or count.
    pub fn reads(&self) -> usize {
        self.get_likers.load(Ordering::SeqCst)
            + self.get_new_likers.load(Ordering::SeqCst)
            + self.count_likes.load(Ordering::SeqCst)
    }
}

/// [`MemoryDecisionStore`] wrapper that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct CountingDecisionStore {
    inner: MemoryDecisionStore,
    pub calls: StoreCalls,
    fail_reads: AtomicBool,
    fail_upsert: AtomicBool,
    fail_mutual: AtomicBool,
}

impl CountingDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for seeding without touching the counters.
    pub fn inner(&self) -> &MemoryDecisionStore {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutual(&self, fail: bool) {
        self.fail_mutual.store(fail, Ordering::SeqCst);
    }

    fn injected(flag: &AtomicBool, op: &str) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DecisionStore for CountingDecisionStore {
    async fn get_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        self.calls.get_likers.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_reads, "get_likers")?;
        self.inner.get_likers(recipient, page).await
    }

    async fn get_new_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        self.calls.get_new_likers.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_reads, "get_new_likers")?;
        self.inner.get_new_likers(recipient, page).await
    }

    async fn count_likes(&self, recipient: &str) -> Result<u64, StorageError> {
        self.calls.count_likes.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_reads, "count_likes")?;
        self.inner.count_likes(recipient).await
    }

    async fn upsert_decision(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
    ) -> Result<(), StorageError> {
        self.calls.upsert_decision.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_upsert, "upsert_decision")?;
        self.inner.upsert_decision(actor, recipient, liked).await
    }

    async fn has_mutual_like(&self, actor: &str, recipient: &str) -> Result<bool, StorageError> {
        self.calls.has_mutual_like.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_mutual, "has_mutual_like")?;
        self.inner.has_mutual_like(actor, recipient).await
    }
}

// ============================================================================
// INSTRUMENTED CACHE BACKEND
// ============================================================================

/// [`InMemoryCacheBackend`] wrapper that counts calls and can be told to fail.
///
/// `set_attempts` counts every write attempt, failed ones included, so tests
/// can observe detached repopulation even when the write is rejected.
#[derive(Debug, Default)]
pub struct RecordingCacheBackend {
    inner: InMemoryCacheBackend,
    pub get_calls: AtomicUsize,
    pub set_attempts: AtomicUsize,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
}

impl RecordingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryCacheBackend {
        &self.inner
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    pub fn set_attempts(&self) -> usize {
        self.set_attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `expected` writes were attempted.
    ///
    /// Repopulation runs in a detached task, so tests poll. Returns whether
    /// the count was reached within two seconds.
    pub async fn wait_for_set_attempts(&self, expected: usize) -> bool {
        for _ in 0..400 {
            if self.set_attempts() >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

#[async_trait]
impl CacheBackend for RecordingCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("injected cache get failure"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let result = if self.fail_sets.load(Ordering::SeqCst) {
            Err(StorageError::unavailable("injected cache set failure"))
        } else {
            self.inner.set(key, value, ttl).await
        };
        // Counted after the write lands so waiters observe the stored value.
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StorageError> {
        self.inner.delete(keys).await
    }

    async fn stats(&self) -> Result<CacheStats, StorageError> {
        self.inner.stats().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::collection::btree_set;
    use proptest::prelude::*;

    /// Non-empty user identifiers.
    pub fn arb_user_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,15}"
    }

    pub fn arb_cursor() -> impl Strategy<Value = Cursor> {
        (any::<i64>(), 1i32..=i32::MAX).prop_map(|(ts, limit)| Cursor::new(ts, limit))
    }

    pub fn arb_page_limit() -> impl Strategy<Value = i32> {
        1i32..=30
    }

    /// Distinct positive epoch seconds, `1..=max_len` of them.
    pub fn arb_distinct_timestamps(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
        btree_set(1_000i64..2_000_000_000, 1..=max_len)
            .prop_map(|set| set.into_iter().collect())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use chrono::{TimeZone, Utc};
    use explore_core::Timestamp;

    /// Epoch seconds as a UTC timestamp.
    pub fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Actor id used by [`seed_likers`] for a like at `secs`.
    pub fn liker_id(secs: i64) -> String {
        format!("liker-{}", secs)
    }

    /// One like of `recipient` per timestamp, from `liker-{ts}`.
    pub async fn seed_likers(store: &MemoryDecisionStore, recipient: &str, timestamps: &[i64]) {
        for secs in timestamps {
            store
                .upsert_decision_at(&liker_id(*secs), recipient, true, ts(*secs))
                .await;
        }
    }

    /// Shared handles for wiring a service under test.
    pub fn instrumented() -> (Arc<CountingDecisionStore>, Arc<RecordingCacheBackend>) {
        (
            Arc::new(CountingDecisionStore::new()),
            Arc::new(RecordingCacheBackend::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_counting_store_counts_and_fails() {
        let store = CountingDecisionStore::new();
        seed_likers(store.inner(), "R", &[300, 200]).await;

        let page = store.get_likers("R", PageCursor::default()).await.unwrap();
        assert_eq!(page.likers.len(), 2);
        assert_eq!(store.calls.reads(), 1);

        store.fail_reads(true);
        assert!(store.count_likes("R").await.is_err());
        assert_eq!(store.calls.reads(), 2);
    }

    #[tokio::test]
    async fn test_recording_cache_counts_failed_sets() {
        let cache = RecordingCacheBackend::new();
        cache.fail_sets(true);
        assert!(cache.set("k", "v", Duration::from_secs(1)).await.is_err());
        assert_eq!(cache.set_attempts(), 1);
        assert!(cache.wait_for_set_attempts(1).await);
        assert_eq!(cache.inner().get("k").await.unwrap(), None);
    }
}
