//! REST API Route Handlers
//!
//! - `/explore/v1/*` - the four Explore RPCs, JSON in and out
//! - `/health/*` - liveness and readiness

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod explore;
pub mod health;

pub use explore::ExploreHandler;

/// Build the full application router.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .nest("/explore/v1", explore::create_router())
        .nest("/health", health::create_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
