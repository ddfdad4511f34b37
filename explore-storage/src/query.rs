//! SQL construction for the decision relation.
//!
//! List queries use keyset pagination on `created_at` (epoch seconds), never
//! OFFSET. Every list query over-fetches by one row so the caller can tell
//! whether another page exists; see [`assemble_page`](crate::assemble_page).

use explore_core::PageCursor;

/// Table holding one row per `(actor_user_id, recipient_user_id)` pair.
pub const DECISIONS_TABLE: &str = "decisions";

pub const COUNT_LIKES_SQL: &str = "SELECT COUNT(*) FROM decisions \
     WHERE recipient_user_id = $1 AND liked_recipient = TRUE";

pub const UPSERT_DECISION_SQL: &str = "INSERT INTO decisions \
     (actor_user_id, recipient_user_id, liked_recipient, created_at) \
     VALUES ($1, $2, $3, NOW()) \
     ON CONFLICT (actor_user_id, recipient_user_id) \
     DO UPDATE SET liked_recipient = EXCLUDED.liked_recipient, created_at = NOW()";

/// Symmetric in its two parameters.
pub const HAS_MUTUAL_LIKE_SQL: &str = "SELECT \
     EXISTS (SELECT 1 FROM decisions \
             WHERE actor_user_id = $1 AND recipient_user_id = $2 AND liked_recipient = TRUE) \
     AND \
     EXISTS (SELECT 1 FROM decisions \
             WHERE actor_user_id = $2 AND recipient_user_id = $1 AND liked_recipient = TRUE)";

/// Which likers a list query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikersFilter {
    /// Everyone who liked the recipient.
    All,
    /// Likers the recipient has not made any decision about yet.
    NotDecidedByRecipient,
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    BigInt(i64),
}

/// Parameterized keyset query over the decision relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetQuery {
    pub recipient: String,
    pub filter: LikersFilter,
    pub page: PageCursor,
}

impl KeysetQuery {
    pub fn likers(recipient: impl Into<String>, page: PageCursor) -> Self {
        Self {
            recipient: recipient.into(),
            filter: LikersFilter::All,
            page,
        }
    }

    pub fn new_likers(recipient: impl Into<String>, page: PageCursor) -> Self {
        Self {
            recipient: recipient.into(),
            filter: LikersFilter::NotDecidedByRecipient,
            page,
        }
    }

    /// Render SQL text with `$n` placeholders and the matching parameters.
    ///
    /// Selected columns are `(actor_user_id TEXT, timestamp BIGINT)`.
    pub fn to_sql(&self) -> (String, Vec<SqlParam>) {
        let mut params = vec![SqlParam::Text(self.recipient.clone())];

        let mut sql = String::from(
            "SELECT d.actor_user_id, EXTRACT(EPOCH FROM d.created_at)::bigint AS timestamp \
             FROM decisions d \
             WHERE d.recipient_user_id = $1 AND d.liked_recipient = TRUE",
        );

        if self.filter == LikersFilter::NotDecidedByRecipient {
            sql.push_str(
                " AND NOT EXISTS (SELECT 1 FROM decisions r \
                 WHERE r.actor_user_id = d.recipient_user_id \
                 AND r.recipient_user_id = d.actor_user_id)",
            );
        }

        if let Some(before) = self.page.before {
            params.push(SqlParam::BigInt(before));
            sql.push_str(&format!(
                " AND EXTRACT(EPOCH FROM d.created_at)::bigint < ${}",
                params.len()
            ));
        }

        params.push(SqlParam::BigInt(self.page.fetch_size()));
        sql.push_str(&format!(
            " ORDER BY d.created_at DESC LIMIT ${}",
            params.len()
        ));

        (sql, params)
    }
}
