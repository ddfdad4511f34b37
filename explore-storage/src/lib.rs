//! Explore Storage - Decision Store and Cache Layer
//!
//! Defines the storage capability the Explore service is written against,
//! the keyset pagination rules every store must follow, an in-memory store,
//! and the cache backends used for read-through caching.
//! The PostgreSQL store lives in explore-api next to its connection pool.

pub mod cache;
pub mod decision_store;
pub mod memory;
pub mod page;
pub mod query;

pub use cache::{
    CacheBackend, CacheBackendExt, CacheStats, CacheTtls, InMemoryCacheBackend, LmdbCacheBackend,
    LmdbCacheError, ReadThroughCache,
};
pub use decision_store::{DecisionStore, LikersPage};
pub use memory::MemoryDecisionStore;
pub use page::assemble_page;
pub use query::{KeysetQuery, LikersFilter, SqlParam};
