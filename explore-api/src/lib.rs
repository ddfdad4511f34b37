//! Explore API - Likes and Decisions Service
//!
//! Answers three read queries about who liked a user (all likers, likers not
//! yet answered, like count) and records like/pass decisions, reporting
//! whether a like completes a mutual like.
//!
//! Reads go through a read-through cache with short per-query TTLs; writes go
//! straight to the decision store and leave the cache to expire.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::{ApiConfig, CacheBackendKind, CacheConfig, LogFormat, StoreKind};
pub use db::{run_migrations, DbConfig, PgDecisionStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::ApiJson;
pub use routes::{create_api_router, ExploreHandler};
pub use services::ExploreService;
pub use state::AppState;
pub use types::*;
