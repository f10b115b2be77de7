//! Component C: dispatches a materialized [`crate::chunk_reader::Chunk`] to
//! the simple or transposed decoder and exposes indexed record access.

pub mod projection;
pub mod simple;
pub mod transposed;

use crate::chunk::ChunkType;
use crate::chunk_reader::Chunk;
use crate::codec::pool::CodecPool;
use crate::error::Result;
use projection::FieldProjection;
use simple::SimpleDecoder;
use transposed::TransposedDecoder;

pub enum ChunkDecoder {
    Simple(SimpleDecoder),
    Transposed(TransposedDecoder),
}

impl ChunkDecoder {
    /// Parse `chunk`'s payload according to its type. `FileSignature` and
    /// `Padding` chunks carry no records and decode to an empty simple
    /// decoder.
    pub fn decode(chunk: &Chunk, projection: Option<&FieldProjection>) -> Result<Self> {
        // Each decoder owns its pool for the lifetime of this one chunk: a
        // simple chunk has exactly one compression_type to acquire once, a
        // transposed chunk's many buckets all share one too, so the pool is
        // handed a codec at most once per chunk and reuses it bucket-to-bucket.
        let mut pool = CodecPool::new();
        match chunk.header.chunk_type {
            ChunkType::FileSignature | ChunkType::Padding => Ok(ChunkDecoder::Simple(
                SimpleDecoder::decode(&[0, 0, 0, 0], 0, 0, &mut pool)?,
            )),
            ChunkType::Simple => Ok(ChunkDecoder::Simple(SimpleDecoder::decode(
                &chunk.payload,
                chunk.header.num_records,
                chunk.header.decoded_data_size,
                &mut pool,
            )?)),
            ChunkType::Transposed | ChunkType::FileMetadata => Ok(ChunkDecoder::Transposed(
                TransposedDecoder::decode(&chunk.payload, projection)?,
            )),
        }
    }

    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        match self {
            ChunkDecoder::Simple(d) => Ok(d.read_record()),
            ChunkDecoder::Transposed(d) => d.read_record(),
        }
    }

    pub fn set_index(&mut self, i: u64) {
        match self {
            ChunkDecoder::Simple(d) => d.set_index(i),
            ChunkDecoder::Transposed(d) => d.set_index(i),
        }
    }

    pub fn index(&self) -> u64 {
        match self {
            ChunkDecoder::Simple(d) => d.index(),
            ChunkDecoder::Transposed(d) => d.index(),
        }
    }

    pub fn num_records(&self) -> u64 {
        match self {
            ChunkDecoder::Simple(d) => d.num_records(),
            ChunkDecoder::Transposed(d) => d.num_records(),
        }
    }

    /// Discard the remainder of the chunk after a read error; records
    /// already emitted are preserved, nothing more will be yielded.
    pub fn recover(&mut self) -> bool {
        match self {
            ChunkDecoder::Simple(d) => d.recover(),
            ChunkDecoder::Transposed(d) => d.recover(),
        }
    }
}
