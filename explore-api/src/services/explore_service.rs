//! Explore Service
//!
//! Cache-aside reads and decision recording.
//!
//! Read path, per request:
//! 1. decode the pagination token (a malformed token fails before any I/O),
//! 2. look up the cache under a key derived from the query shape,
//! 3. on hit, return the cached response as is,
//! 4. on miss or cache fault, make exactly one storage call,
//! 5. hand the response to a detached repopulation task and return it.
//!
//! Input validation (non-empty identifiers) belongs to the request handler and
//! is not repeated here.

use std::sync::Arc;

use explore_core::{CacheKey, ExploreError, ExploreResult, PageCursor, QueryKind};
use explore_storage::{DecisionStore, ReadThroughCache};

use crate::types::ListLikedYouResponse;

/// Orchestrates the decision store and the read-through cache.
#[derive(Clone)]
pub struct ExploreService {
    store: Arc<dyn DecisionStore>,
    cache: ReadThroughCache,
}

impl ExploreService {
    pub fn new(store: Arc<dyn DecisionStore>, cache: ReadThroughCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn DecisionStore> {
        &self.store
    }

    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    /// Everyone who liked `recipient`, newest first.
    pub async fn list_likers(
        &self,
        recipient: &str,
        token: &str,
    ) -> ExploreResult<ListLikedYouResponse> {
        self.list(QueryKind::Likers, recipient, token).await
    }

    /// Likers of `recipient` that `recipient` has not decided on yet.
    pub async fn list_new_likers(
        &self,
        recipient: &str,
        token: &str,
    ) -> ExploreResult<ListLikedYouResponse> {
        self.list(QueryKind::NewLikers, recipient, token).await
    }

    /// Number of likes `recipient` has received.
    pub async fn count_likers(&self, recipient: &str) -> ExploreResult<u64> {
        let key = CacheKey::likers_count(recipient);
        if let Some(count) = self.cache.lookup::<u64>(&key).await {
            return Ok(count);
        }

        let count = self.store.count_likes(recipient).await.map_err(|e| {
            tracing::error!(recipient_user_id = %recipient, error = %e, "failed to count likers");
            ExploreError::from(e)
        })?;

        self.cache.repopulate_raw(
            key,
            count.to_string(),
            self.cache.ttls().for_kind(QueryKind::LikersCount),
        );

        Ok(count)
    }

    /// Record `actor`'s decision on `recipient` and report whether it
    /// completes a mutual like.
    ///
    /// The mutual check only runs for likes; a pass never yields `true`.
    /// Cached lists and counts are left to expire on their own.
    pub async fn create_decision(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
    ) -> ExploreResult<bool> {
        self.store
            .upsert_decision(actor, recipient, liked)
            .await
            .map_err(|e| {
                tracing::error!(
                    actor_user_id = %actor,
                    recipient_user_id = %recipient,
                    error = %e,
                    "failed to create decision"
                );
                ExploreError::from(e)
            })?;

        if !liked {
            return Ok(false);
        }

        self.store
            .has_mutual_like(actor, recipient)
            .await
            .map_err(|e| {
                tracing::error!(
                    actor_user_id = %actor,
                    recipient_user_id = %recipient,
                    error = %e,
                    "failed to check mutual like"
                );
                ExploreError::MutualCheckFailed(e)
            })
    }

    async fn list(
        &self,
        kind: QueryKind,
        recipient: &str,
        token: &str,
    ) -> ExploreResult<ListLikedYouResponse> {
        let page = PageCursor::from_token(token)?;

        let key = match kind {
            QueryKind::NewLikers => CacheKey::new_likers(recipient, token),
            _ => CacheKey::likers(recipient, token),
        };
        if let Some(cached) = self.cache.lookup::<ListLikedYouResponse>(&key).await {
            return Ok(cached);
        }

        let result = match kind {
            QueryKind::NewLikers => self.store.get_new_likers(recipient, page).await,
            _ => self.store.get_likers(recipient, page).await,
        };
        let likers_page = result.map_err(|e| {
            tracing::error!(
                recipient_user_id = %recipient,
                query = %kind,
                error = %e,
                "failed to fetch likers"
            );
            ExploreError::from(e)
        })?;

        let response = ListLikedYouResponse::from(likers_page);
        self.cache
            .repopulate_json(key, &response, self.cache.ttls().for_kind(kind));

        Ok(response)
    }
}
