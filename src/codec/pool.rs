//! Bounded per-codec reuse pool.
//!
//! The codecs here (`zstd`, `brotli`, `snap`) are stateless — `Box<dyn Codec>`
//! holds no per-call context — but constructing one still means an
//! allocation and a vtable dispatch setup per chunk. Grounded on the
//! teacher's `perf.rs` pooling rationale ("decompressor contexts are
//! expensive to allocate; recycle them"); scaled down from the teacher's
//! Rayon-parallel batch compressor to a simple bounded LIFO stack since this
//! reader is single-threaded per §5.

use std::collections::HashMap;

use super::{get_codec, Codec, CompressionType};

const MAX_PER_CODEC: usize = 4;

/// Per-codec LIFO reuse pool, owned by a chunk decoder.
pub struct CodecPool {
    free: HashMap<CompressionType, Vec<Box<dyn Codec>>>,
}

impl CodecPool {
    pub fn new() -> Self {
        Self {
            free: HashMap::new(),
        }
    }

    /// Acquire a codec instance for `ty`, reusing a pooled one if available.
    pub fn acquire(&mut self, ty: CompressionType) -> Box<dyn Codec> {
        self.free
            .get_mut(&ty)
            .and_then(|v| v.pop())
            .unwrap_or_else(|| get_codec(ty))
    }

    /// Return a codec instance to the pool for later reuse. Dropped instead
    /// of pooled once `MAX_PER_CODEC` are already held for this codec.
    pub fn release(&mut self, codec: Box<dyn Codec>) {
        let ty = codec.compression_type();
        let slot = self.free.entry(ty).or_default();
        if slot.len() < MAX_PER_CODEC {
            slot.push(codec);
        }
    }
}

impl Default for CodecPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_release_roundtrip() {
        let mut pool = CodecPool::new();
        let c = pool.acquire(CompressionType::Zstd);
        assert_eq!(c.compression_type(), CompressionType::Zstd);
        pool.release(c);
        assert_eq!(pool.free.get(&CompressionType::Zstd).unwrap().len(), 1);
        let _ = pool.acquire(CompressionType::Zstd);
        assert_eq!(pool.free.get(&CompressionType::Zstd).unwrap().len(), 0);
    }

    #[test]
    fn bounded_capacity() {
        let mut pool = CodecPool::new();
        for _ in 0..(MAX_PER_CODEC + 2) {
            pool.release(get_codec(CompressionType::Snappy));
        }
        assert_eq!(
            pool.free.get(&CompressionType::Snappy).unwrap().len(),
            MAX_PER_CODEC
        );
    }
}
