//! Decision relation and its read projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque user identifier as supplied by callers.
pub type UserId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A directed like/pass edge from `actor_user_id` to `recipient_user_id`.
///
/// At most one decision exists per ordered pair. Recording a new decision for
/// the same pair overwrites `liked_recipient` and refreshes `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub actor_user_id: UserId,
    pub recipient_user_id: UserId,
    pub liked_recipient: bool,
    pub created_at: Timestamp,
}

impl Decision {
    /// Create a decision stamped with the current time.
    pub fn new(
        actor_user_id: impl Into<UserId>,
        recipient_user_id: impl Into<UserId>,
        liked_recipient: bool,
    ) -> Self {
        Self::at(actor_user_id, recipient_user_id, liked_recipient, Utc::now())
    }

    /// Create a decision with an explicit timestamp.
    pub fn at(
        actor_user_id: impl Into<UserId>,
        recipient_user_id: impl Into<UserId>,
        liked_recipient: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            actor_user_id: actor_user_id.into(),
            recipient_user_id: recipient_user_id.into(),
            liked_recipient,
            created_at,
        }
    }

    /// Epoch seconds of `created_at`, the keyset ordering key.
    pub fn created_at_epoch(&self) -> i64 {
        self.created_at.timestamp()
    }

    /// Project this decision as a liker of its recipient.
    pub fn to_liker(&self) -> Liker {
        Liker {
            actor_id: self.actor_user_id.clone(),
            timestamp: self.created_at_epoch(),
        }
    }
}

/// A user who liked the recipient, with the epoch second the like was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liker {
    pub actor_id: UserId,
    pub timestamp: i64,
}

impl Liker {
    pub fn new(actor_id: impl Into<UserId>, timestamp: i64) -> Self {
        Self {
            actor_id: actor_id.into(),
            timestamp,
        }
    }
}
