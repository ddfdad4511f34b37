//! Opaque pagination cursor.
//!
//! A cursor is the client-held continuation state for keyset pagination:
//! the `created_at` epoch second of the last row the client has seen and the
//! page size it asked for. It travels as URL-safe base64 over JSON and is
//! never persisted server-side.
//!
//! Only this module knows the token layout. Stores receive a [`PageCursor`],
//! which is the already-decoded, already-normalized form.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{ExploreError, ExploreResult, StorageError};

/// Page size used when no cursor is supplied or the cursor's limit is not positive.
pub const DEFAULT_PAGE_LIMIT: i32 = 20;

/// Decoded pagination token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Epoch seconds of the last item on the previous page.
    pub last_created_at: i64,
    /// Requested page size.
    pub limit: i32,
}

impl Cursor {
    pub fn new(last_created_at: i64, limit: i32) -> Self {
        Self {
            last_created_at,
            limit,
        }
    }

    /// Encode this cursor as an opaque, URL-safe token.
    pub fn encode(&self) -> ExploreResult<String> {
        let json = serde_json::to_vec(self).map_err(|e| {
            ExploreError::StorageUnavailable(StorageError::Serialization {
                reason: format!("failed to encode pagination token: {}", e),
            })
        })?;
        Ok(URL_SAFE.encode(json))
    }

    /// Decode an opaque token.
    ///
    /// An empty token means "first page, default settings" and yields `None`.
    /// A token that is not valid base64 or not a cursor document fails with
    /// [`ExploreError::InvalidCursor`]. A cursor with `limit <= 0` decodes
    /// successfully; [`PageCursor::from_cursor`] normalizes it.
    pub fn decode(token: &str) -> ExploreResult<Option<Cursor>> {
        if token.is_empty() {
            return Ok(None);
        }

        let bytes = URL_SAFE
            .decode(token)
            .map_err(|e| ExploreError::invalid_cursor(format!("not base64: {}", e)))?;

        let cursor: Cursor = serde_json::from_slice(&bytes)
            .map_err(|e| ExploreError::invalid_cursor(format!("not a cursor: {}", e)))?;

        Ok(Some(cursor))
    }
}

/// Normalized keyset bounds for one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Only rows strictly older than this epoch second are returned.
    pub before: Option<i64>,
    /// Page size, always positive.
    pub limit: i32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            before: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageCursor {
    /// First page with the given size. Non-positive sizes fall back to the default.
    pub fn first_page(limit: i32) -> Self {
        Self {
            before: None,
            limit: normalize_limit(limit),
        }
    }

    /// Build page bounds from an optionally decoded cursor.
    pub fn from_cursor(cursor: Option<Cursor>) -> Self {
        match cursor {
            None => Self::default(),
            Some(c) => Self {
                before: Some(c.last_created_at),
                limit: normalize_limit(c.limit),
            },
        }
    }

    /// Decode a token straight into page bounds.
    pub fn from_token(token: &str) -> ExploreResult<Self> {
        Cursor::decode(token).map(Self::from_cursor)
    }

    /// Number of rows a store fetches to learn whether another page exists.
    pub fn fetch_size(&self) -> i64 {
        i64::from(self.limit) + 1
    }

    /// Page size as a slice length.
    pub fn page_len(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(DEFAULT_PAGE_LIMIT as usize)
    }

    /// Continuation cursor positioned after an item with the given timestamp.
    pub fn next_after(&self, last_created_at: i64) -> Cursor {
        Cursor::new(last_created_at, self.limit)
    }
}

fn normalize_limit(limit: i32) -> i32 {
    if limit <= 0 {
        DEFAULT_PAGE_LIMIT
    } else {
        limit
    }
}
