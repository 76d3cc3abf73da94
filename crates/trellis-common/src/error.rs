//! Trellis Error - Unified Error Types
//!
//! Comprehensive error handling for all Trellis operations. Categorizes
//! errors by the four contract kinds surfaced to callers (authorization,
//! duplicate, limit, structure) plus the fatal configuration and lookup
//! failures that abort an operation.
//!
//! Key Features:
//! - Domain-specific error variants for precise error handling
//! - Stable machine-readable error codes
//! - Contract-kind classification for caller policy
//! - Seamless integration with std::io::Error
//!
//! @version 0.1.0
//! @author Trellis Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all Trellis operations.
#[derive(Error, Debug)]
pub enum TrellisError {
    // Authorization errors
    #[error("authorization denied: {0}")]
    Authorization(String),

    // Duplicate errors
    #[error("duplicate: {0}")]
    Duplicate(String),

    // Limit errors
    #[error("limit exceeded: {0}")]
    Limit(String),

    // Structure errors
    #[error("invalid document structure: {0}")]
    Structure(String),

    // Lookup errors
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("filter not found: {0}")]
    FilterNotFound(String),

    // Configuration errors
    #[error("unknown attribute type: {0}")]
    UnknownType(String),

    #[error("unknown format: {0}")]
    UnknownFormat(String),

    #[error("unsupported index type: {0}")]
    UnsupportedIndex(String),

    // Value errors
    #[error("invalid relationship value: {0}")]
    Relationship(String),

    #[error("invalid query: {0}")]
    Query(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("numeric bound violated: {0}")]
    Bound(String),

    #[error("{0}")]
    Invalid(String),

    // Adapter / backend errors
    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;

// =============================================================================
// Error Classification
// =============================================================================

/// The contract-level kind of an error, as surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    Duplicate,
    Limit,
    Structure,
    Generic,
}

impl TrellisError {
    /// Classify this error into its contract kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::Limit(_) => ErrorKind::Limit,
            Self::Structure(_) => ErrorKind::Structure,
            _ => ErrorKind::Generic,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authorization(_) => "authorization",
            Self::Duplicate(_) => "duplicate",
            Self::Limit(_) => "limit",
            Self::Structure(_) => "structure",
            Self::CollectionNotFound(_) => "collection_not_found",
            Self::AttributeNotFound(_) => "attribute_not_found",
            Self::IndexNotFound(_) => "index_not_found",
            Self::DocumentNotFound(_) => "document_not_found",
            Self::FilterNotFound(_) => "filter_not_found",
            Self::UnknownType(_) => "unknown_type",
            Self::UnknownFormat(_) => "unknown_format",
            Self::UnsupportedIndex(_) => "unsupported_index",
            Self::Relationship(_) => "relationship",
            Self::Query(_) => "query",
            Self::InvalidId(_) => "invalid_id",
            Self::Bound(_) => "bound",
            Self::Invalid(_) => "invalid",
            Self::Adapter(_) => "adapter",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Whether this error is a user error (bad input) rather than a
    /// system failure.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Adapter(_) | Self::Serialization(_) | Self::Io(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(TrellisError::Duplicate("x".into()).code(), "duplicate");
        assert_eq!(TrellisError::Limit("x".into()).code(), "limit");
        assert_eq!(
            TrellisError::CollectionNotFound("x".into()).code(),
            "collection_not_found"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TrellisError::Authorization("denied".into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            TrellisError::Structure("bad".into()).kind(),
            ErrorKind::Structure
        );
        assert_eq!(
            TrellisError::FilterNotFound("json2".into()).kind(),
            ErrorKind::Generic
        );
    }

    #[test]
    fn test_display() {
        let err = TrellisError::Invalid("Cannot set a default value on a required attribute".into());
        assert_eq!(
            err.to_string(),
            "Cannot set a default value on a required attribute"
        );
    }
}
