//! Trellis Id - Identifier Generation and Validation
//!
//! Generated identifiers are a hex time prefix plus random hex entropy, so
//! they sort roughly by creation time while staying unique across engines.
//! Custom identifiers are validated against the key rules shared by
//! collections, attributes, and indexes.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::error::{Result, TrellisError};
use crate::schema::LENGTH_KEY;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

const HEX: &[u8] = b"0123456789abcdef";

/// Identifier helpers.
pub struct Id;

impl Id {
    /// Generate a unique identifier: hex seconds + microseconds, padded
    /// with random hex entropy.
    pub fn unique() -> String {
        Self::unique_with_padding(7)
    }

    /// Generate a unique identifier with a chosen amount of random hex
    /// entropy appended.
    pub fn unique_with_padding(padding: usize) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let mut id = format!("{:08x}{:05x}", now.as_secs(), now.subsec_micros());

        let mut rng = rand::thread_rng();
        for _ in 0..padding {
            id.push(HEX[rng.gen_range(0..HEX.len())] as char);
        }

        id
    }

    /// Validate a caller-chosen identifier.
    pub fn custom(id: impl Into<String>) -> Result<String> {
        let id = id.into();
        Self::validate_key(&id)?;
        Ok(id)
    }

    /// Validate a collection, attribute, or index key.
    pub fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(TrellisError::InvalidId("key must not be empty".to_string()));
        }
        if key.len() > LENGTH_KEY {
            return Err(TrellisError::InvalidId(format!(
                "key must be at most {} characters",
                LENGTH_KEY
            )));
        }
        if key.starts_with('$') {
            return Err(TrellisError::InvalidId(
                "key must not start with the reserved '$' prefix".to_string(),
            ));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(TrellisError::InvalidId(format!(
                "key '{}' contains invalid characters",
                key
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_differ() {
        let a = Id::unique();
        let b = Id::unique();
        assert_ne!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_custom_accepts_valid_keys() {
        assert!(Id::custom("books").is_ok());
        assert!(Id::custom("book_reviews-2024").is_ok());
    }

    #[test]
    fn test_custom_rejects_invalid_keys() {
        assert!(Id::custom("").is_err());
        assert!(Id::custom("$id").is_err());
        assert!(Id::custom("has space").is_err());
        assert!(Id::custom("a".repeat(256)).is_err());
    }

    #[test]
    fn test_key_length_boundary() {
        assert!(Id::validate_key(&"a".repeat(255)).is_ok());
        assert!(Id::validate_key(&"a".repeat(256)).is_err());
    }
}
