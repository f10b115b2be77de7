//! The single 64-bit fingerprint used for block headers, chunk headers, and
//! chunk payloads.
//!
//! Fixed algorithm, fixed seed — this is a portability contract, not a
//! performance knob. Every reader and writer of this format must compute the
//! exact same value for the exact same bytes, forever.

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Seed is frozen at zero. Never change this; it would silently invalidate
/// every previously written file.
pub const HASH_SEED: u64 = 0;

#[inline]
pub fn hash64(data: &[u8]) -> u64 {
    xxh3_64_with_seed(data, HASH_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(hash64(b"hello"), hash64(b"hello"));
        assert_ne!(hash64(b"hello"), hash64(b"hellp"));
    }

    #[test]
    fn empty_input_is_stable() {
        // Not asserting a specific magic constant (that would just duplicate
        // the xxh3 implementation); asserting it doesn't panic and is
        // idempotent is what we actually rely on.
        assert_eq!(hash64(b""), hash64(b""));
    }
}
