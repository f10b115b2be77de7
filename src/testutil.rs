//! Internal fixture writer.
//!
//! Exists purely so the reader's test suite (round-trip, corruption
//! injection, projection scenarios) has *something* that produces valid
//! files — there is no production writer. Reachable outside `#[cfg(test)]`
//! only so integration tests under `tests/` can use it too; it carries no
//! semver guarantee and is not documented as a feature.

use byteorder::{ByteOrder, LittleEndian};

use crate::block_header::{BlockHeader, BLOCK_HEADER_SIZE, BLOCK_SIZE};
use crate::chunk::{ChunkHeader, ChunkType, CHUNK_HEADER_SIZE};
use crate::codec::{get_codec, CompressionType};
use crate::hash::hash64;
use crate::metadata::RecordsMetadata;
use crate::wire::{write_length_delimited, write_varint, WireKind};

fn pad8(mut buf: Vec<u8>) -> Vec<u8> {
    let pad = (8 - (buf.len() % 8)) % 8;
    buf.resize(buf.len() + pad, 0);
    buf
}

/// Mirrors `RawWriter::write_logical`'s boundary-crossing arithmetic without
/// touching a buffer: how many raw bytes (content plus any 24-byte block
/// headers interposed) does writing `content_len` logical bytes starting at
/// `chunk_start` occupy, and how many boundaries does it cross.
fn raw_span(chunk_start: u64, content_len: u64) -> (u64, u64) {
    let mut pos = chunk_start;
    let mut remaining = content_len;
    let mut boundaries = 0u64;
    while remaining > 0 {
        if pos % BLOCK_SIZE == 0 {
            pos += BLOCK_HEADER_SIZE as u64;
            boundaries += 1;
        }
        let to_boundary = BLOCK_SIZE - pos % BLOCK_SIZE;
        let take = remaining.min(to_boundary);
        pos += take;
        remaining -= take;
    }
    (pos - chunk_start, boundaries)
}

/// Appends bytes to an in-progress file, transparently injecting a 24-byte
/// block header whenever the write cursor crosses a 64 KiB boundary.
struct RawWriter {
    buf: Vec<u8>,
}

impl RawWriter {
    fn new() -> Self {
        let mut w = Self { buf: Vec::new() };
        w.buf.extend_from_slice(&BlockHeader::new(0, BLOCK_SIZE).to_bytes());
        w
    }

    fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Append `bytes`, which together form one logical unit (a chunk's
    /// header+payload) that began at `chunk_start`. `previous_chunk_offset`
    /// on any block header crossed is derived from that start; the
    /// complementary `next_chunk_offset` is `BLOCK_SIZE - previous`, per
    /// this format's resolved invariant (see `DESIGN.md`).
    fn write_logical(&mut self, bytes: &[u8], chunk_start: u64) {
        let mut remaining = bytes;
        while !remaining.is_empty() {
            if self.position() % BLOCK_SIZE == 0 {
                let previous = self.position() - chunk_start;
                let next = BLOCK_SIZE - previous.min(BLOCK_SIZE);
                self.buf
                    .extend_from_slice(&BlockHeader::new(previous, next).to_bytes());
            }
            let to_boundary = (BLOCK_SIZE - self.position() % BLOCK_SIZE) as usize;
            let take = remaining.len().min(to_boundary);
            self.buf.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
        }
    }
}

pub struct FixtureWriter {
    raw: RawWriter,
}

impl Default for FixtureWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureWriter {
    pub fn new() -> Self {
        Self { raw: RawWriter::new() }
    }

    fn write_chunk(&mut self, header: ChunkHeader, payload_padded: Vec<u8>) {
        let chunk_start = self.raw.position();
        let mut combined = Vec::with_capacity(CHUNK_HEADER_SIZE + payload_padded.len());
        combined.extend_from_slice(&header.to_bytes());
        combined.extend_from_slice(&payload_padded);
        let content_len = combined.len() as u64;
        let (full_span, boundaries) = raw_span(chunk_start, content_len);
        self.raw.write_logical(&combined, chunk_start);

        // A chunk that straddles exactly one block boundary leaves that
        // boundary's `next_chunk_offset` equal to `BLOCK_SIZE - previous`
        // (see `RawWriter::write_logical`). Top it off with a Padding chunk
        // so the chunk that naturally follows starts exactly
        // `chunk_start + BLOCK_SIZE` bytes in, making that arithmetic a real
        // pointer to a real chunk header instead of a filler value that
        // happens to satisfy the invariant. Chunks aligned to a boundary, or
        // spanning more than one, are left as-is: recovery for those falls
        // back to `ChunkReader::recover`'s direct-probe attempt.
        if chunk_start % BLOCK_SIZE != 0 && boundaries == 1 {
            let target_end = chunk_start + BLOCK_SIZE;
            let full_end = chunk_start + full_span;
            if full_end < target_end && target_end - full_end >= CHUNK_HEADER_SIZE as u64 {
                let pad_total = target_end - full_end;
                let pad_payload_len = (pad_total - CHUNK_HEADER_SIZE as u64) as usize;
                let pad_payload = vec![0u8; pad_payload_len];
                let pad_header = ChunkHeader::new(
                    hash64(&pad_payload),
                    pad_payload_len as u64,
                    ChunkType::Padding,
                    0,
                    pad_payload_len as u64,
                );
                let mut pad_combined = Vec::with_capacity(CHUNK_HEADER_SIZE + pad_payload_len);
                pad_combined.extend_from_slice(&pad_header.to_bytes());
                pad_combined.extend_from_slice(&pad_payload);
                let pad_start = self.raw.position();
                self.raw.write_logical(&pad_combined, pad_start);
            }
        }
    }

    pub fn add_signature(&mut self) {
        let header = ChunkHeader::new(hash64(&[]), 0, ChunkType::FileSignature, 0, 0);
        self.write_chunk(header, Vec::new());
    }

    pub fn add_simple_chunk(&mut self, records: &[&[u8]]) {
        self.add_simple_chunk_compressed(records, CompressionType::None)
    }

    pub fn add_simple_chunk_compressed(&mut self, records: &[&[u8]], ty: CompressionType) {
        let codec = get_codec(ty);
        let concatenated: Vec<u8> = records.iter().flat_map(|r| r.to_vec()).collect();
        let compressed = codec.compress(&concatenated, 3).expect("fixture compression");

        let mut payload = Vec::new();
        let mut ty_bytes = [0u8; 4];
        LittleEndian::write_u32(&mut ty_bytes, ty.to_u32());
        payload.extend_from_slice(&ty_bytes);
        for r in records {
            write_varint(&mut payload, r.len() as u64);
        }
        payload.extend_from_slice(&compressed);

        let header = ChunkHeader::new(
            hash64(&payload),
            payload.len() as u64,
            ChunkType::Simple,
            records.len() as u64,
            concatenated.len() as u64,
        );
        self.write_chunk(header, pad8(payload));
    }

    /// Columns as `(tag_path, wire_kind, self_delimited_values)`; one walk
    /// per logical record, each entry a column index. Shared by both the
    /// metadata-chunk writer below and transposed-data fixtures built
    /// directly by tests.
    pub fn build_transposed_payload(
        compression_type: CompressionType,
        columns: &[(Vec<u64>, WireKind, Vec<Vec<u8>>)],
        walks: &[Vec<usize>],
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.push(compression_type.to_u32() as u8);
        write_varint(&mut payload, columns.len() as u64);
        for (tags, kind, _) in columns {
            write_varint(&mut payload, tags.len() as u64);
            for t in tags {
                write_varint(&mut payload, *t);
            }
            payload.push(kind.to_byte());
        }
        write_varint(&mut payload, walks.len() as u64);
        for walk in walks {
            write_varint(&mut payload, walk.len() as u64);
            for c in walk {
                write_varint(&mut payload, *c as u64);
            }
        }
        write_varint(&mut payload, columns.len() as u64);
        let codec = get_codec(compression_type);
        let bucket_bytes: Vec<Vec<u8>> = columns
            .iter()
            .map(|(_, _, values)| {
                let concatenated: Vec<u8> = values.iter().flat_map(|v| v.clone()).collect();
                codec.compress(&concatenated, 3).expect("fixture compression")
            })
            .collect();
        for (i, (_, _, values)) in columns.iter().enumerate() {
            let decompressed_len: usize = values.iter().map(|v| v.len()).sum();
            write_varint(&mut payload, bucket_bytes[i].len() as u64);
            write_varint(&mut payload, decompressed_len as u64);
        }
        for b in &bucket_bytes {
            payload.extend_from_slice(b);
        }
        payload
    }

    pub fn add_transposed_chunk(
        &mut self,
        num_records: u64,
        columns: &[(Vec<u64>, WireKind, Vec<Vec<u8>>)],
        walks: &[Vec<usize>],
    ) {
        let payload = Self::build_transposed_payload(CompressionType::None, columns, walks);
        let decoded_data_size: u64 = columns
            .iter()
            .flat_map(|(_, _, values)| values.iter())
            .map(|v| v.len() as u64)
            .sum();
        let header = ChunkHeader::new(
            hash64(&payload),
            payload.len() as u64,
            ChunkType::Transposed,
            num_records,
            decoded_data_size,
        );
        self.write_chunk(header, pad8(payload));
    }

    /// `RecordsMetadata`'s own field numbers happen to match this format's
    /// two leaf columns 1:1, so the metadata message can be built with a
    /// single degenerate transposed chunk holding exactly one record.
    pub fn add_metadata_chunk(&mut self, metadata: &RecordsMetadata) {
        let mut columns: Vec<(Vec<u64>, WireKind, Vec<Vec<u8>>)> = Vec::new();
        let mut walk: Vec<usize> = Vec::new();

        if let Some(name) = &metadata.record_type_name {
            let mut value = Vec::new();
            write_length_delimited(&mut value, name.as_bytes());
            columns.push((vec![1], WireKind::LengthDelimited, vec![value]));
            walk.push(columns.len() - 1);
        }
        if !metadata.file_descriptors.is_empty() {
            let values: Vec<Vec<u8>> = metadata
                .file_descriptors
                .iter()
                .map(|fd| {
                    let mut v = Vec::new();
                    write_length_delimited(&mut v, fd);
                    v
                })
                .collect();
            let col_index = columns.len();
            for _ in &values {
                walk.push(col_index);
            }
            columns.push((vec![2], WireKind::LengthDelimited, values));
        }

        let payload = Self::build_transposed_payload(CompressionType::None, &columns, &[walk]);
        let header = ChunkHeader::new(
            hash64(&payload),
            payload.len() as u64,
            ChunkType::FileMetadata,
            0,
            payload.len() as u64,
        );
        self.write_chunk(header, pad8(payload));
    }

    pub fn finish(self) -> Vec<u8> {
        self.raw.buf
    }

    /// Current length of the buffer so far, useful for tests that need to
    /// locate and corrupt specific byte ranges.
    pub fn len(&self) -> usize {
        self.raw.buf.len()
    }
}
