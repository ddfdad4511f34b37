//! Deterministic cache keys for the read queries.
//!
//! List queries are keyed by `(operation, recipient, pagination token)`;
//! counts by `(operation, recipient)` only. Valid tokens are URL-safe base64
//! and never contain `:`, so keys cannot collide across pages.

use std::fmt;

/// The cacheable read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Likers,
    NewLikers,
    LikersCount,
}

impl QueryKind {
    /// Key prefix for this operation.
    pub fn prefix(&self) -> &'static str {
        match self {
            QueryKind::Likers => "likers",
            QueryKind::NewLikers => "newlikers",
            QueryKind::LikersCount => "likerscount",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A cache key for one query shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn likers(recipient: &str, token: &str) -> Self {
        Self(format!("{}:{}:{}", QueryKind::Likers, recipient, token))
    }

    pub fn new_likers(recipient: &str, token: &str) -> Self {
        Self(format!("{}:{}:{}", QueryKind::NewLikers, recipient, token))
    }

    pub fn likers_count(recipient: &str) -> Self {
        Self(format!("{}:{}", QueryKind::LikersCount, recipient))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(CacheKey::likers("user123", "").as_str(), "likers:user123:");
        assert_eq!(
            CacheKey::new_likers("user123", "abc=").as_str(),
            "newlikers:user123:abc="
        );
        assert_eq!(CacheKey::likers_count("user123").as_str(), "likerscount:user123");
    }

    #[test]
    fn test_keys_differ_per_operation_and_page() {
        let first = CacheKey::likers("u", "");
        let second = CacheKey::likers("u", "token");
        let new_first = CacheKey::new_likers("u", "");
        assert_ne!(first, second);
        assert_ne!(first, new_first);
    }
}
