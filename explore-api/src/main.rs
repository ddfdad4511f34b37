//! Explore API Server Entry Point
//!
//! Bootstraps configuration and telemetry, builds the decision store and
//! cache backend, and starts the Axum HTTP server.

use std::sync::Arc;

use explore_api::telemetry::init_tracing;
use explore_api::{
    create_api_router, run_migrations, ApiConfig, ApiError, ApiResult, AppState,
    CacheBackendKind, DbConfig, PgDecisionStore, StoreKind,
};
use explore_storage::{
    CacheBackend, DecisionStore, InMemoryCacheBackend, LmdbCacheBackend, MemoryDecisionStore,
    ReadThroughCache,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let api_config = ApiConfig::from_env();
    init_tracing(api_config.log_format)?;

    let store = build_store(&api_config).await?;
    let cache_backend = build_cache_backend(&api_config)?;
    let cache = ReadThroughCache::new(cache_backend, api_config.cache.ttls);

    let app = create_api_router(AppState::new(store, cache));

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Explore API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn build_store(config: &ApiConfig) -> ApiResult<Arc<dyn DecisionStore>> {
    match config.store {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory decision store; decisions are lost on restart");
            Ok(Arc::new(MemoryDecisionStore::new()))
        }
        StoreKind::Postgres => {
            let db_config = DbConfig::from_env();
            let store = PgDecisionStore::from_config(&db_config)?;
            if db_config.run_migrations {
                run_migrations(store.pool()).await?;
            }
            tracing::info!(
                host = %db_config.host,
                dbname = %db_config.dbname,
                pool_size = db_config.max_size,
                "PostgreSQL decision store configured"
            );
            Ok(Arc::new(store))
        }
    }
}

fn build_cache_backend(config: &ApiConfig) -> ApiResult<Arc<dyn CacheBackend>> {
    match config.cache.backend {
        CacheBackendKind::Memory => Ok(Arc::new(InMemoryCacheBackend::new())),
        CacheBackendKind::Lmdb => {
            let backend = LmdbCacheBackend::new(&config.cache.path, config.cache.max_size_mb)
                .map_err(|e| {
                    ApiError::service_unavailable(format!("Failed to open cache: {}", e))
                })?;
            tracing::info!(path = %config.cache.path.display(), "LMDB cache opened");
            Ok(Arc::new(backend))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
