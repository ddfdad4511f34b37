//! Decision store capability.
//!
//! The Explore service depends only on this trait, so it can run against
//! PostgreSQL in production and [`MemoryDecisionStore`](crate::MemoryDecisionStore)
//! in tests.

use async_trait::async_trait;
use explore_core::{Liker, PageCursor, StorageError};
use serde::{Deserialize, Serialize};

/// One page of likers plus the token for the next page, if any.
///
/// `next_token` is `None` at the end of pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikersPage {
    pub likers: Vec<Liker>,
    pub next_token: Option<String>,
}

/// Async storage trait for the decision relation.
///
/// Implementations must be safe under concurrent access. Faults are reported
/// as [`StorageError`] and never retried at this layer.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Likers of `recipient`, newest first, strictly older than `page.before`
    /// when set, at most `page.limit` items.
    async fn get_likers(&self, recipient: &str, page: PageCursor)
        -> Result<LikersPage, StorageError>;

    /// Likers of `recipient` whom `recipient` has not yet decided on, with the
    /// same keyset contract as [`DecisionStore::get_likers`].
    async fn get_new_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError>;

    /// Total number of likes received by `recipient`.
    async fn count_likes(&self, recipient: &str) -> Result<u64, StorageError>;

    /// Insert or overwrite the decision for `(actor, recipient)`, refreshing
    /// its timestamp to now.
    async fn upsert_decision(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
    ) -> Result<(), StorageError>;

    /// True iff `actor` liked `recipient` and `recipient` liked `actor`.
    async fn has_mutual_like(&self, actor: &str, recipient: &str) -> Result<bool, StorageError>;

    /// Cheap reachability check for readiness.
    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
