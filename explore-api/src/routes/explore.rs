//! Explore RPC Endpoints
//!
//! [`ExploreHandler`] is the transport-agnostic request handler: it checks
//! required fields, calls [`ExploreService`], and maps failures to the two
//! boundary categories. The axum functions below only move JSON in and out;
//! bodies that do not decode are rejected through [`ApiJson`] as invalid input.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use explore_core::{ExploreError, ExploreResult};

use crate::error::{ApiError, ApiResult};
use crate::extractors::ApiJson;
use crate::services::ExploreService;
use crate::state::AppState;
use crate::types::{
    CountLikedYouRequest, CountLikedYouResponse, ListLikedYouRequest, ListLikedYouResponse,
    PutDecisionRequest, PutDecisionResponse,
};

// ============================================================================
// REQUEST HANDLER
// ============================================================================

#[derive(Clone)]
pub struct ExploreHandler {
    service: Arc<ExploreService>,
}

impl ExploreHandler {
    pub fn new(service: Arc<ExploreService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<ExploreService> {
        &self.service
    }

    pub async fn list_liked_you(&self, req: ListLikedYouRequest) -> ApiResult<ListLikedYouResponse> {
        require("recipient_user_id", &req.recipient_user_id)
            .map_err(|e| ApiError::from_explore(&e, "failed to get likers"))?;

        self.service
            .list_likers(&req.recipient_user_id, req.token())
            .await
            .map_err(|e| ApiError::from_explore(&e, "failed to get likers"))
    }

    pub async fn list_new_liked_you(
        &self,
        req: ListLikedYouRequest,
    ) -> ApiResult<ListLikedYouResponse> {
        require("recipient_user_id", &req.recipient_user_id)
            .map_err(|e| ApiError::from_explore(&e, "failed to get new likers"))?;

        self.service
            .list_new_likers(&req.recipient_user_id, req.token())
            .await
            .map_err(|e| ApiError::from_explore(&e, "failed to get new likers"))
    }

    pub async fn count_liked_you(
        &self,
        req: CountLikedYouRequest,
    ) -> ApiResult<CountLikedYouResponse> {
        require("recipient_user_id", &req.recipient_user_id)
            .map_err(|e| ApiError::from_explore(&e, "failed to count likers"))?;

        let count = self
            .service
            .count_likers(&req.recipient_user_id)
            .await
            .map_err(|e| ApiError::from_explore(&e, "failed to count likers"))?;

        Ok(CountLikedYouResponse { count })
    }

    pub async fn put_decision(&self, req: PutDecisionRequest) -> ApiResult<PutDecisionResponse> {
        validate_decision(&req).map_err(|e| ApiError::from_explore(&e, "failed to create decision"))?;

        let mutual_likes = self
            .service
            .create_decision(&req.actor_user_id, &req.recipient_user_id, req.liked_recipient)
            .await
            .map_err(|e| ApiError::from_explore(&e, "failed to create decision"))?;

        Ok(PutDecisionResponse { mutual_likes })
    }
}

fn require(field: &str, value: &str) -> ExploreResult<()> {
    if value.is_empty() {
        Err(ExploreError::missing_field(field))
    } else {
        Ok(())
    }
}

fn validate_decision(req: &PutDecisionRequest) -> ExploreResult<()> {
    require("actor_user_id", &req.actor_user_id)?;
    require("recipient_user_id", &req.recipient_user_id)?;
    if req.actor_user_id == req.recipient_user_id {
        return Err(ExploreError::SameIdentity);
    }
    Ok(())
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// POST /explore/v1/list-liked-you
pub async fn list_liked_you(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ListLikedYouRequest>,
) -> ApiResult<Json<ListLikedYouResponse>> {
    state.handler.list_liked_you(req).await.map(Json)
}

/// POST /explore/v1/list-new-liked-you
pub async fn list_new_liked_you(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ListLikedYouRequest>,
) -> ApiResult<Json<ListLikedYouResponse>> {
    state.handler.list_new_liked_you(req).await.map(Json)
}

/// POST /explore/v1/count-liked-you
pub async fn count_liked_you(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CountLikedYouRequest>,
) -> ApiResult<Json<CountLikedYouResponse>> {
    state.handler.count_liked_you(req).await.map(Json)
}

/// POST /explore/v1/put-decision
pub async fn put_decision(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PutDecisionRequest>,
) -> ApiResult<Json<PutDecisionResponse>> {
    state.handler.put_decision(req).await.map(Json)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/list-liked-you", post(list_liked_you))
        .route("/list-new-liked-you", post(list_new_liked_you))
        .route("/count-liked-you", post(count_liked_you))
        .route("/put-decision", post(put_decision))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_validation_order() {
        let err = validate_decision(&PutDecisionRequest::default()).unwrap_err();
        assert_eq!(err, ExploreError::missing_field("actor_user_id"));

        let req = PutDecisionRequest {
            actor_user_id: "a".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_decision(&req).unwrap_err(),
            ExploreError::missing_field("recipient_user_id")
        );

        let req = PutDecisionRequest {
            actor_user_id: "a".to_string(),
            recipient_user_id: "a".to_string(),
            liked_recipient: true,
        };
        assert_eq!(validate_decision(&req).unwrap_err(), ExploreError::SameIdentity);
    }
}
