//! Explore Core - Decision Types and Cursor Codec
//!
//! Pure data structures shared by every other crate in the workspace:
//! the decision relation, the liker projection, the opaque pagination
//! cursor and the error taxonomy. Storage and transport live elsewhere.

pub mod cursor;
pub mod entities;
pub mod error;
pub mod keys;

pub use cursor::{Cursor, PageCursor, DEFAULT_PAGE_LIMIT};
pub use entities::{Decision, Liker, Timestamp, UserId};
pub use error::{ExploreError, ExploreResult, StorageError};
pub use keys::{CacheKey, QueryKind};
