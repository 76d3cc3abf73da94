//! Trellis Utils - Utility Functions
//!
//! Hashing helpers shared across the façade, primarily the selection
//! fingerprint used to partition cache entries for the same document.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use xxhash_rust::xxh3::xxh3_64;

/// Compute a 64-bit hash of the given bytes using xxHash3.
#[inline]
pub fn hash64(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Fingerprint a selection list: order-insensitive, hex-encoded.
///
/// The same attribute set always yields the same fingerprint regardless of
/// the order the caller listed it in.
pub fn selection_fingerprint(selections: &[String]) -> String {
    let mut sorted: Vec<&str> = selections.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    format!("{:016x}", hash64(sorted.join("\u{1f}").as_bytes()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash64_is_deterministic() {
        assert_eq!(hash64(b"trellis"), hash64(b"trellis"));
        assert_ne!(hash64(b"trellis"), hash64(b"Trellis"));
    }

    #[test]
    fn test_fingerprint_order_insensitive() {
        let a = selection_fingerprint(&["title".into(), "year".into()]);
        let b = selection_fingerprint(&["year".into(), "title".into()]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_fingerprint_distinguishes_sets() {
        let a = selection_fingerprint(&["title".into()]);
        let b = selection_fingerprint(&["year".into()]);
        assert_ne!(a, b);
    }
}
