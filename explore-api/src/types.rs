//! Request and response messages for the Explore RPC routes.
//!
//! Every request field defaults when absent from the JSON body, so a missing
//! identifier arrives as an empty string and is rejected by validation with a
//! field-specific message rather than a generic decode error.

use explore_core::Liker;
use explore_storage::LikersPage;
use serde::{Deserialize, Serialize};

// ============================================================================
// REQUESTS
// ============================================================================

/// Request for `ListLikedYou` and `ListNewLikedYou`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLikedYouRequest {
    #[serde(default)]
    pub recipient_user_id: String,
    /// Token from a previous response. Absent or empty means first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_token: Option<String>,
}

impl ListLikedYouRequest {
    pub fn new(recipient_user_id: impl Into<String>) -> Self {
        Self {
            recipient_user_id: recipient_user_id.into(),
            pagination_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.pagination_token = Some(token.into());
        self
    }

    pub fn token(&self) -> &str {
        self.pagination_token.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLikedYouRequest {
    #[serde(default)]
    pub recipient_user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutDecisionRequest {
    #[serde(default)]
    pub actor_user_id: String,
    #[serde(default)]
    pub recipient_user_id: String,
    #[serde(default)]
    pub liked_recipient: bool,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikerResponse {
    pub actor_id: String,
    pub unix_timestamp: u64,
}

impl From<Liker> for LikerResponse {
    fn from(liker: Liker) -> Self {
        Self {
            actor_id: liker.actor_id,
            // Pre-epoch rows clamp to zero.
            unix_timestamp: u64::try_from(liker.timestamp).unwrap_or(0),
        }
    }
}

/// Response for `ListLikedYou` and `ListNewLikedYou`.
///
/// This is also the payload cached for list queries, so a cache hit returns
/// exactly what the storage path returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLikedYouResponse {
    pub likers: Vec<LikerResponse>,
    /// Present only when another page exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_pagination_token: Option<String>,
}

impl From<LikersPage> for ListLikedYouResponse {
    fn from(page: LikersPage) -> Self {
        Self {
            likers: page.likers.into_iter().map(LikerResponse::from).collect(),
            next_pagination_token: page.next_token,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLikedYouResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutDecisionResponse {
    pub mutual_likes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: PutDecisionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.actor_user_id, "");
        assert_eq!(req.recipient_user_id, "");
        assert!(!req.liked_recipient);

        let req: ListLikedYouRequest =
            serde_json::from_str(r#"{"recipient_user_id":"user123"}"#).unwrap();
        assert_eq!(req.token(), "");
    }

    #[test]
    fn test_next_token_omitted_on_last_page() {
        let response = ListLikedYouResponse::from(LikersPage {
            likers: vec![Liker::new("u1", 100)],
            next_token: None,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("next_pagination_token").is_none());
        assert_eq!(json["likers"][0]["actor_id"], "u1");
        assert_eq!(json["likers"][0]["unix_timestamp"], 100);
    }
}
