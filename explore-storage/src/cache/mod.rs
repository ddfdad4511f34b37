//! Cache layer for the read queries.
//!
//! The cache is strictly best-effort. A read that fails for any reason is a
//! miss, and a write that fails is logged and forgotten. Correctness never
//! depends on the cache; it only trades a bounded staleness window (the TTL)
//! for fewer storage reads under bursty polling.
//!
//! Writes to the decision relation do not invalidate cached entries.

pub mod lmdb_backend;
pub mod memory_backend;
pub mod read_through;
pub mod traits;

pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use read_through::{CacheTtls, ReadThroughCache};
pub use traits::{CacheBackend, CacheBackendExt, CacheStats};
