//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`DecisionStore`] implementation that runs the keyset queries built in
//! `explore_storage::query` against it.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use explore_core::{Liker, PageCursor, StorageError};
use explore_storage::query::{
    COUNT_LIKES_SQL, HAS_MUTUAL_LIKE_SQL, UPSERT_DECISION_SQL,
};
use explore_storage::{assemble_page, DecisionStore, KeysetQuery, LikersPage, SqlParam};
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use crate::error::{ApiError, ApiResult};

/// Schema migrations, applied in order.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_create_decisions",
    include_str!("../migrations/0001_create_decisions.sql"),
)];

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
    /// Apply schema migrations at startup
    pub run_migrations: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "explore".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            run_migrations: false,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("EXPLORE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("EXPLORE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("EXPLORE_DB_NAME").unwrap_or_else(|_| "explore".to_string()),
            user: std::env::var("EXPLORE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("EXPLORE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("EXPLORE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("EXPLORE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            run_migrations: std::env::var("EXPLORE_DB_RUN_MIGRATIONS")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// Connections are opened lazily, so this succeeds without a reachable
    /// database.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// MIGRATIONS
// ============================================================================

/// Apply every migration. Each script is idempotent.
pub async fn run_migrations(pool: &Pool) -> ApiResult<()> {
    let client = pool.get().await?;
    for (name, sql) in MIGRATIONS {
        tracing::info!(migration = %name, "Applying migration");
        client.batch_execute(sql).await?;
    }
    Ok(())
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pg_error(err: tokio_postgres::Error) -> StorageError {
    tracing::error!("Database error: {:?}", err);
    StorageError::query("database operation failed")
}

fn pool_error(err: deadpool_postgres::PoolError) -> StorageError {
    tracing::error!("Connection pool error: {:?}", err);
    StorageError::unavailable("failed to acquire database connection")
}

// ============================================================================
// POSTGRES DECISION STORE
// ============================================================================

/// [`DecisionStore`] backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgDecisionStore {
    pool: Pool,
}

impl PgDecisionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> Result<Object, StorageError> {
        self.pool.get().await.map_err(pool_error)
    }

    async fn run_keyset(&self, query: KeysetQuery) -> Result<LikersPage, StorageError> {
        let (sql, params) = query.to_sql();
        let bound: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| match p {
                SqlParam::Text(s) => s as &(dyn ToSql + Sync),
                SqlParam::BigInt(n) => n as &(dyn ToSql + Sync),
            })
            .collect();

        let client = self.conn().await?;
        let rows = client.query(sql.as_str(), &bound).await.map_err(pg_error)?;

        let likers = rows
            .iter()
            .map(|row| {
                let actor_id: String = row.try_get(0).map_err(pg_error)?;
                let timestamp: i64 = row.try_get(1).map_err(pg_error)?;
                Ok(Liker::new(actor_id, timestamp))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        assemble_page(likers, query.page)
    }
}

#[async_trait]
impl DecisionStore for PgDecisionStore {
    async fn get_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        self.run_keyset(KeysetQuery::likers(recipient, page)).await
    }

    async fn get_new_likers(
        &self,
        recipient: &str,
        page: PageCursor,
    ) -> Result<LikersPage, StorageError> {
        self.run_keyset(KeysetQuery::new_likers(recipient, page)).await
    }

    async fn count_likes(&self, recipient: &str) -> Result<u64, StorageError> {
        let client = self.conn().await?;
        let row = client
            .query_one(COUNT_LIKES_SQL, &[&recipient])
            .await
            .map_err(pg_error)?;
        let count: i64 = row.try_get(0).map_err(pg_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn upsert_decision(
        &self,
        actor: &str,
        recipient: &str,
        liked: bool,
    ) -> Result<(), StorageError> {
        let client = self.conn().await?;
        client
            .execute(UPSERT_DECISION_SQL, &[&actor, &recipient, &liked])
            .await
            .map_err(pg_error)?;
        Ok(())
    }

    async fn has_mutual_like(&self, actor: &str, recipient: &str) -> Result<bool, StorageError> {
        let client = self.conn().await?;
        let row = client
            .query_one(HAS_MUTUAL_LIKE_SQL, &[&actor, &recipient])
            .await
            .map_err(pg_error)?;
        let mutual: Option<bool> = row.try_get(0).map_err(pg_error)?;
        Ok(mutual.unwrap_or(false))
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        let client = self.conn().await?;
        client.simple_query("SELECT 1").await.map_err(pg_error)?;
        Ok(())
    }
}
