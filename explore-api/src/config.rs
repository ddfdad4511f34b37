//! API Configuration Module
//!
//! Server, store, cache and logging settings, loaded from environment
//! variables with defaults suitable for local development. Database settings
//! live in [`DbConfig`](crate::db::DbConfig).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use explore_storage::CacheTtls;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which decision store the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Which cache backend the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Lmdb,
}

impl CacheBackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "lmdb" => Some(Self::Lmdb),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// LMDB directory.
    pub path: PathBuf,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
    pub ttls: CacheTtls,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            path: PathBuf::from("./data/explore-cache"),
            max_size_mb: 256,
            ttls: CacheTtls::default(),
        }
    }
}

impl CacheConfig {
    /// Environment variables:
    /// - `EXPLORE_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `EXPLORE_CACHE_PATH`: LMDB directory (default: ./data/explore-cache)
    /// - `EXPLORE_CACHE_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `EXPLORE_CACHE_TTL_LIKERS_SECS` (default: 30)
    /// - `EXPLORE_CACHE_TTL_NEW_LIKERS_SECS` (default: 20)
    /// - `EXPLORE_CACHE_TTL_COUNT_SECS` (default: 15)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ttls = CacheTtls::default()
            .with_likers(env_secs("EXPLORE_CACHE_TTL_LIKERS_SECS", defaults.ttls.likers))
            .with_new_likers(env_secs(
                "EXPLORE_CACHE_TTL_NEW_LIKERS_SECS",
                defaults.ttls.new_likers,
            ))
            .with_count(env_secs("EXPLORE_CACHE_TTL_COUNT_SECS", defaults.ttls.count));

        Self {
            backend: std::env::var("EXPLORE_CACHE_BACKEND")
                .ok()
                .and_then(|s| CacheBackendKind::parse(&s))
                .unwrap_or(defaults.backend),
            path: std::env::var("EXPLORE_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            max_size_mb: std::env::var("EXPLORE_CACHE_MAX_SIZE_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size_mb),
            ttls,
        }
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind: String,
    /// Port to listen on. Kept as text so a bad value is reported at bind time.
    pub port: String,
    pub store: StoreKind,
    pub cache: CacheConfig,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: "8080".to_string(),
            store: StoreKind::Postgres,
            cache: CacheConfig::default(),
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `EXPLORE_API_BIND`: interface (default: 0.0.0.0)
    /// - `PORT` or `EXPLORE_API_PORT`: port (default: 8080)
    /// - `EXPLORE_STORE`: "postgres" or "memory" (default: postgres)
    /// - `EXPLORE_LOG_FORMAT`: "json" or "pretty" (default: json)
    /// - cache settings, see [`CacheConfig::from_env`]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: std::env::var("EXPLORE_API_BIND").unwrap_or(defaults.bind),
            port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("EXPLORE_API_PORT").ok())
                .unwrap_or(defaults.port),
            store: std::env::var("EXPLORE_STORE")
                .ok()
                .and_then(|s| StoreKind::parse(&s))
                .unwrap_or(defaults.store),
            cache: CacheConfig::from_env(),
            log_format: match std::env::var("EXPLORE_LOG_FORMAT") {
                Ok(s) if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
        }
    }

    /// Resolve the listen address.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self.port.parse::<u16>().map_err(|_| {
            ApiError::invalid_input(format!("Invalid port value: {}", self.port))
        })?;

        let addr = format!("{}:{}", self.bind, port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}
