//! In-memory decision store.
//!
//! Applies the same filtering, ordering and keyset rules as the SQL in
//! [`query`](crate::query), so it can stand in for PostgreSQL in tests and in
//! single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use explore_core::{Decision, Liker, PageCursor, StorageError, Timestamp};
use tokio::sync::RwLock;

use crate::decision_store::{DecisionStore, LikersPage};
use crate::page::assemble_page;
use crate::query::LikersFilter;

type PairKey = (String, String);

/// Decision store backed by a `HashMap` keyed on `(actor, recipient)`.
#[derive(Debug, Default)]
pub struct MemoryDecisionStore {
    decisions: RwLock<HashMap<PairKey, Decision>>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert with an explicit timestamp. Lets tests lay out keyset pages.
    pub async fn upsert_decision_at(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
        created_at: Timestamp,
    ) {
        let decision = Decision::at(actor, recipient, liked, created_at);
        self.decisions
            .write()
            .await
            .insert((actor.to_string(), recipient.to_string()), decision);
    }

    /// The stored decision for `(actor, recipient)`, if any.
    pub async fn decision(&self, actor: &str, recipient: &str) -> Option<Decision> {
        self.decisions
            .read()
            .await
            .get(&(actor.to_string(), recipient.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.decisions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.decisions.read().await.is_empty()
    }

    async fn select_likers(
        &self,
        recipient: &str,
        filter: LikersFilter,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        let decisions = self.decisions.read().await;

        let mut matching: Vec<&Decision> = decisions
            .values()
            .filter(|d| d.recipient_user_id == recipient && d.liked_recipient)
            .filter(|d| match page.before {
                Some(before) => d.created_at_epoch() < before,
                None => true,
            })
            .filter(|d| match filter {
                LikersFilter::All => true,
                LikersFilter::NotDecidedByRecipient => !decisions
                    .contains_key(&(recipient.to_string(), d.actor_user_id.clone())),
            })
            .collect();

        // Newest first; actor id breaks ties so pages are stable.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.actor_user_id.cmp(&b.actor_user_id))
        });

        let rows: Vec<Liker> = matching
            .into_iter()
            .take(page.page_len() + 1)
            .map(Decision::to_liker)
            .collect();

        assemble_page(rows, page)
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn get_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        self.select_likers(recipient, LikersFilter::All, page).await
    }

    async fn get_new_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        self.select_likers(recipient, LikersFilter::NotDecidedByRecipient, page)
            .await
    }

    async fn count_likes(&self, recipient: &str) -> Result<u64, StorageError> {
        let decisions = self.decisions.read().await;
        let count = decisions
            .values()
            .filter(|d| d.recipient_user_id == recipient && d.liked_recipient)
            .count();
        Ok(count as u64)
    }

    async fn upsert_decision(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
    ) -> Result<(), StorageError> {
        self.upsert_decision_at(actor, recipient, liked, Utc::now())
            .await;
        Ok(())
    }

    async fn has_mutual_like(&self, actor: &str, recipient: &str) -> Result<bool, StorageError> {
        let decisions = self.decisions.read().await;
        let liked = |from: &str, to: &str| {
            decisions
                .get(&(from.to_string(), to.to_string()))
                .map(|d| d.liked_recipient)
                .unwrap_or(false)
        };
        Ok(liked(actor, recipient) && liked(recipient, actor))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use explore_core::Cursor;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn ids(page: &LikersPage) -> Vec<&str> {
        page.likers.iter().map(|l| l.actor_id.as_str()).collect()
    }

    async fn seeded() -> MemoryDecisionStore {
        let store = MemoryDecisionStore::new();
        store.upsert_decision_at("u1", "R", true, at(100)).await;
        store.upsert_decision_at("u2", "R", true, at(200)).await;
        store.upsert_decision_at("u3", "R", true, at(300)).await;
        store
    }

    #[tokio::test]
    async fn test_likers_paginate_newest_first() {
        let store = seeded().await;

        let first = store
            .get_likers("R", PageCursor::first_page(2))
            .await
            .unwrap();
        assert_eq!(ids(&first), vec!["u3", "u2"]);
        let token = first.next_token.clone().expect("next token");
        assert_eq!(Cursor::decode(&token).unwrap(), Some(Cursor::new(200, 2)));

        let second = store
            .get_likers("R", PageCursor::from_token(&token).unwrap())
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["u1"]);
        assert_eq!(second.likers[0].timestamp, 100);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_passes_are_not_likers() {
        let store = seeded().await;
        store.upsert_decision_at("u4", "R", false, at(400)).await;

        let page = store.get_likers("R", PageCursor::default()).await.unwrap();
        assert_eq!(ids(&page), vec!["u3", "u2", "u1"]);
        assert_eq!(store.count_likes("R").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_new_likers_skip_users_recipient_decided_on() {
        let store = seeded().await;
        // R passed on u2: u2 is no longer new, whichever way R decided.
        store.upsert_decision_at("R", "u2", false, at(250)).await;

        let page = store
            .get_new_likers("R", PageCursor::default())
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["u3", "u1"]);
        assert!(page.next_token.is_none());

        // Plain likers are unaffected.
        let all = store.get_likers("R", PageCursor::default()).await.unwrap();
        assert_eq!(all.likers.len(), 3);
    }

    #[tokio::test]
    async fn test_new_likers_paginate_with_token() {
        let store = seeded().await;

        let first = store
            .get_new_likers("R", PageCursor::first_page(1))
            .await
            .unwrap();
        assert_eq!(ids(&first), vec!["u3"]);
        let token = first.next_token.expect("next token");

        let second = store
            .get_new_likers("R", PageCursor::from_token(&token).unwrap())
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["u2"]);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_pair() {
        let store = MemoryDecisionStore::new();
        store.upsert_decision("a", "b", true).await.unwrap();
        store.upsert_decision("a", "b", true).await.unwrap();
        assert_eq!(store.len().await, 1);

        store.upsert_decision("a", "b", false).await.unwrap();
        assert_eq!(store.len().await, 1);
        let decision = store.decision("a", "b").await.unwrap();
        assert!(!decision.liked_recipient);
        assert_eq!(store.count_likes("b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutual_like_is_symmetric() {
        let store = MemoryDecisionStore::new();
        store.upsert_decision("a", "b", true).await.unwrap();
        assert!(!store.has_mutual_like("a", "b").await.unwrap());

        store.upsert_decision("b", "a", true).await.unwrap();
        assert!(store.has_mutual_like("a", "b").await.unwrap());
        assert!(store.has_mutual_like("b", "a").await.unwrap());

        store.upsert_decision("b", "a", false).await.unwrap();
        assert!(!store.has_mutual_like("a", "b").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_empty() {
        let store = seeded().await;
        let page = store
            .get_likers("nobody", PageCursor::default())
            .await
            .unwrap();
        assert!(page.likers.is_empty());
        assert!(page.next_token.is_none());
        assert_eq!(store.count_likes("nobody").await.unwrap(), 0);
    }
}
