//! Error types for Explore operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Query failed: {reason}")]
    Query { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

impl StorageError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn query(reason: impl Into<String>) -> Self {
        Self::Query {
            reason: reason.into(),
        }
    }
}

/// Master error type for all Explore errors.
///
/// Client errors (`InvalidCursor`, `MissingField`, `SameIdentity`) are
/// detected before cache or storage is touched. Everything else is a
/// server-side fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExploreError {
    #[error("Invalid pagination token: {reason}")]
    InvalidCursor { reason: String },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Actor and recipient cannot be the same user")]
    SameIdentity,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("Mutual like check failed: {0}")]
    MutualCheckFailed(StorageError),
}

impl ExploreError {
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            reason: reason.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCursor { .. } | Self::MissingField { .. } | Self::SameIdentity
        )
    }
}

/// Result type alias for Explore operations.
pub type ExploreResult<T> = Result<T, ExploreError>;

// =============================================================================
// TESTS
// =============================================================================
