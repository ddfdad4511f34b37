//! JSON body extractor with API-shaped rejections.
//!
//! `axum::Json` rejects bad bodies with a plain-text response and a status of
//! its own choosing (400, 415 or 422). `ApiJson<T>` turns every such rejection
//! into an [`ApiError`] with `ErrorCode::InvalidInput`, so clients only ever
//! see the `{code, message}` body.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Extractor for JSON request bodies.
///
/// # Example
///
/// ```rust,ignore
/// async fn put_decision(
///     State(state): State<AppState>,
///     ApiJson(req): ApiJson<PutDecisionRequest>,
/// ) -> ApiResult<Json<PutDecisionResponse>> {
///     state.handler.put_decision(req).await.map(Json)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
