//! FNV-1a hash utilities for MerkleTree bucket routing.
//!
//! Provides a 32-bit FNV-1a hash that iterates over UTF-16 code units to match
//! the TypeScript `String.charCodeAt()` behavior, ensuring identical hashes
//! across Rust and TypeScript for cross-language MerkleTree synchronization.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes a 32-bit FNV-1a hash of a string, iterating over UTF-16 code units.
///
/// TypeScript strings are UTF-16 internally and `charCodeAt()` returns a code
/// unit, not a Unicode scalar value. Hashing Rust's UTF-8 bytes directly would
/// diverge from the TS implementation for any non-ASCII input, breaking
/// cross-language Merkle root agreement. Iterating `encode_utf16()` keeps the
/// two implementations bit-identical.
///
/// # Examples
///
/// ```
/// use topgun_core::hash::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash("hello"), fnv1a_hash("hello"));
/// assert_ne!(fnv1a_hash("hello"), fnv1a_hash("world"));
/// ```
#[must_use]
pub fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in s.encode_utf16() {
        // Fold each UTF-16 code unit in as two bytes, matching a char-code-at-a-time
        // FNV-1a over a UTF-16 string (low byte first, matching typical JS ports).
        hash ^= u32::from(unit & 0x00ff);
        hash = hash.wrapping_mul(FNV_PRIME);
        hash ^= u32::from(unit >> 8);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Combines a slice of 32-bit hashes into one via wrapping sum.
///
/// Used to fold child-node hashes into a parent hash in [`crate::merkle`]: the
/// sum is order-independent, so node children can be iterated in any order
/// (e.g. a `HashMap`'s bucket order) and still produce a deterministic parent.
#[must_use]
pub fn combine_hashes(hashes: &[u32]) -> u32 {
    hashes.iter().fold(0_u32, |acc, h| acc.wrapping_add(*h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_hashes_to_offset_basis() {
        assert_eq!(fnv1a_hash(""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn same_input_is_deterministic() {
        assert_eq!(fnv1a_hash("hello world"), fnv1a_hash("hello world"));
    }

    #[test]
    fn different_input_differs() {
        assert_ne!(fnv1a_hash("key1"), fnv1a_hash("key2"));
    }

    #[test]
    fn unicode_input_does_not_panic() {
        let _ = fnv1a_hash("héllo wörld 🎉");
    }

    #[test]
    fn combine_hashes_empty_is_zero() {
        assert_eq!(combine_hashes(&[]), 0);
    }

    #[test]
    fn combine_hashes_order_independent() {
        let a = combine_hashes(&[1, 2, 3]);
        let b = combine_hashes(&[3, 1, 2]);
        assert_eq!(a, b);
    }

    #[test]
    fn combine_hashes_wraps_on_overflow() {
        let a = combine_hashes(&[u32::MAX, 1]);
        assert_eq!(a, 0);
    }

    #[test]
    fn combine_single_hash_is_identity() {
        assert_eq!(combine_hashes(&[42]), 42);
    }
}
