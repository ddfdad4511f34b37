//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use explore_storage::{CacheBackend, DecisionStore, ReadThroughCache};

use crate::routes::explore::ExploreHandler;
use crate::services::ExploreService;

/// Application-wide state shared across all routes.
///
/// Everything is constructed once at startup and injected here; there is no
/// process-global cache or store handle.
#[derive(Clone)]
pub struct AppState {
    pub handler: ExploreHandler,
    pub store: Arc<dyn DecisionStore>,
    pub cache_backend: Arc<dyn CacheBackend>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the service and handler over an injected store and cache.
    pub fn new(store: Arc<dyn DecisionStore>, cache: ReadThroughCache) -> Self {
        let cache_backend = Arc::clone(cache.backend());
        let service = Arc::new(ExploreService::new(Arc::clone(&store), cache));
        Self {
            handler: ExploreHandler::new(service),
            store,
            cache_backend,
            start_time: Instant::now(),
        }
    }
}
