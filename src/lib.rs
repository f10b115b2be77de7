//! # riegeli-rs — Riegeli record-file reader
//!
//! Format guarantees this reader relies on:
//! - All numeric fields are little-endian
//! - Every block (64 KiB boundary) carries a self-describing header with its
//!   own hash; every chunk header carries a hash over its own fields plus a
//!   separate hash over the chunk payload
//! - Chunk types are closed: `FileSignature`, `FileMetadata`, `Padding`,
//!   `Simple`, `Transposed`
//! - `compression_type` is closed: `none`, `brotli`, `zstd`, `snappy` — any
//!   other on-disk value is a hard decode error, never a silent fallback
//! - Recovery is forward-only: a corrupted region is bridged by scanning for
//!   the next block boundary whose header names a parseable chunk header

pub mod block_header;
pub mod byte_source;
pub mod chunk;
pub mod chunk_decoder;
pub mod chunk_reader;
pub mod codec;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod options;
pub mod perf;
pub mod record_reader;
#[doc(hidden)]
pub mod testutil;
pub mod wire;

pub use byte_source::{ByteSource, FileSource, SliceSource};
pub use chunk_decoder::projection::{FieldProjection, PathSentinel, ProjectedPath};
pub use chunk_reader::SkippedRegion;
pub use codec::{Codec, CompressionType};
pub use error::{RecoverableAt, Result, RiegeliError};
pub use metadata::RecordsMetadata;
pub use options::ReaderOptions;
pub use record_reader::{RecordPosition, RecordReader};
