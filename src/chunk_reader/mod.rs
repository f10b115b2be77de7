//! Component B: block framing, chunk materialization, and forward re-sync
//! recovery.
//!
//! Presents chunks as atomic units over a [`ByteSource`], transparently
//! skipping the 24-byte block headers interleaved at every 64 KiB boundary.
//! Grounded on the teacher's `recovery/scanner.rs` scan-forward-for-the-next-
//! plausible-header technique, applied here at block-header granularity
//! instead of `byte271-6cy`'s whole-block-magic-number granularity.

use crate::block_header::{BlockHeader, BLOCK_HEADER_SIZE, BLOCK_SIZE};
use crate::byte_source::ByteSource;
use crate::chunk::{ChunkHeader, ChunkType, CHUNK_HEADER_SIZE};
use crate::error::{RecoverableAt, Result, RiegeliError};
use crate::hash::hash64;

/// A fully materialized chunk: header plus payload bytes (unpadded,
/// `data_size` long).
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_begin: u64,
    pub header: ChunkHeader,
    pub payload: Vec<u8>,
}

/// A byte range bridged by recovery, with an explanatory reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegion {
    pub begin: u64,
    pub end: u64,
    pub reason: String,
}

pub struct ChunkReader<S: ByteSource> {
    source: S,
}

impl<S: ByteSource> ChunkReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn position(&self) -> u64 {
        self.source.position()
    }

    pub fn size(&self) -> Option<u64> {
        self.source.size()
    }

    pub fn supports_random_access(&self) -> bool {
        self.source.supports_random_access()
    }

    fn at_eof(&mut self) -> Result<bool> {
        Ok(self.source.pull(1)?.is_empty())
    }

    fn read_raw_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let need = n - out.len();
            let avail = self.source.pull(need)?;
            if avail.is_empty() {
                return Err(RiegeliError::truncated(
                    "unexpected end of file",
                    RecoverableAt::ChunkReader,
                ));
            }
            let take = avail.len().min(need);
            out.extend_from_slice(&avail[..take]);
            self.source.cursor_advance(take);
        }
        Ok(out)
    }

    fn skip_block_header_if_at_boundary(&mut self) -> Result<()> {
        if self.position() % BLOCK_SIZE != 0 {
            return Ok(());
        }
        let bytes = self.read_raw_exact(BLOCK_HEADER_SIZE)?;
        let mut arr = [0u8; BLOCK_HEADER_SIZE];
        arr.copy_from_slice(&bytes);
        BlockHeader::from_bytes(&arr).ok_or_else(|| {
            RiegeliError::data_loss("invalid block header", RecoverableAt::ChunkReader)
        })?;
        Ok(())
    }

    /// Read `n` logical bytes, transparently consuming and validating any
    /// block headers crossed along the way.
    fn read_logical(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            self.skip_block_header_if_at_boundary()?;
            let remaining = n - out.len();
            let to_boundary = (BLOCK_SIZE - self.position() % BLOCK_SIZE) as usize;
            let take = remaining.min(to_boundary);
            let bytes = self.read_raw_exact(take)?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Raw file offset reached after advancing `logical_len` logical bytes
    /// from raw offset `start`, accounting for any block headers crossed.
    /// Pure arithmetic — does not touch the source.
    fn logical_span_end(start: u64, logical_len: u64) -> u64 {
        let mut raw = start;
        let mut remaining = logical_len;
        while remaining > 0 {
            if raw % BLOCK_SIZE == 0 {
                raw += BLOCK_HEADER_SIZE as u64;
            }
            let to_boundary = BLOCK_SIZE - raw % BLOCK_SIZE;
            let take = remaining.min(to_boundary);
            raw += take;
            remaining -= take;
        }
        raw
    }

    /// Read and validate the next chunk header, consuming it but leaving the
    /// payload unread. Returns `None` at clean end-of-file.
    pub fn pull_chunk_header(&mut self) -> Result<Option<(u64, ChunkHeader)>> {
        if self.at_eof()? {
            return Ok(None);
        }
        let chunk_begin = self.position();
        let header_bytes = self.read_logical(CHUNK_HEADER_SIZE)?;
        let mut arr = [0u8; CHUNK_HEADER_SIZE];
        arr.copy_from_slice(&header_bytes);
        let header = ChunkHeader::from_bytes(&arr).ok_or_else(|| {
            RiegeliError::data_loss("chunk header hash mismatch", RecoverableAt::ChunkReader)
        })?;
        Ok(Some((chunk_begin, header)))
    }

    /// Read the payload for a header already obtained from
    /// [`Self::pull_chunk_header`], validating `data_hash`.
    pub fn read_chunk_payload(&mut self, chunk_begin: u64, header: ChunkHeader) -> Result<Chunk> {
        let padded = header.padded_data_size() as usize;
        let payload_padded = self.read_logical(padded)?;
        let payload = payload_padded[..header.data_size as usize].to_vec();
        if hash64(&payload) != header.data_hash {
            return Err(RiegeliError::data_loss(
                "chunk payload hash mismatch",
                RecoverableAt::ChunkReader,
            ));
        }
        Ok(Chunk {
            chunk_begin,
            header,
            payload,
        })
    }

    /// Read one full chunk (header + payload). `None` at clean end-of-file.
    pub fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        match self.pull_chunk_header()? {
            None => Ok(None),
            Some((chunk_begin, header)) => Ok(Some(self.read_chunk_payload(chunk_begin, header)?)),
        }
    }

    /// Validate that the file starts with a zero-record `FileSignature`
    /// chunk. Consumes that chunk's header (payload is empty by
    /// construction, so nothing of substance is lost).
    pub fn check_file_format(&mut self) -> Result<bool> {
        match self.pull_chunk_header()? {
            Some((_, header))
                if header.chunk_type == ChunkType::FileSignature && header.num_records == 0 =>
            {
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Random-access seek to a byte position asserted to be a chunk
    /// boundary (not validated here; the next `read_chunk` call will fail
    /// if it isn't).
    pub fn seek(&mut self, position: u64) -> Result<()> {
        if !self.source.supports_random_access() {
            return Err(RiegeliError::Unimplemented(
                "seek requires a random-access byte source".into(),
            ));
        }
        self.source.seek(position)?;
        Ok(())
    }

    /// Locate the chunk whose span covers `position`, consulting the
    /// enclosing block header's `previous_chunk_offset` to find a starting
    /// point, then scanning forward. Leaves the reader positioned at that
    /// chunk's start and returns its `chunk_begin`.
    pub fn seek_to_chunk_containing(&mut self, position: u64) -> Result<u64> {
        if !self.source.supports_random_access() {
            return Err(RiegeliError::Unimplemented(
                "seek requires a random-access byte source".into(),
            ));
        }
        let block_start = position - position % BLOCK_SIZE;
        self.seek(block_start)?;
        let header_bytes = self.read_raw_exact(BLOCK_HEADER_SIZE)?;
        let mut arr = [0u8; BLOCK_HEADER_SIZE];
        arr.copy_from_slice(&header_bytes);
        let block_header = BlockHeader::from_bytes(&arr).ok_or_else(|| {
            RiegeliError::data_loss("invalid block header", RecoverableAt::ChunkReader)
        })?;
        let chunk_begin = block_start.saturating_sub(block_header.previous_chunk_offset);
        self.seek(chunk_begin)?;

        loop {
            let begin = self.position();
            match self.pull_chunk_header()? {
                None => {
                    self.seek(begin)?;
                    return Ok(begin);
                }
                Some((_, header)) => {
                    let span = CHUNK_HEADER_SIZE as u64 + header.padded_data_size();
                    let chunk_end = Self::logical_span_end(begin, span);
                    if chunk_end > position {
                        self.seek(begin)?;
                        return Ok(begin);
                    }
                    self.seek(chunk_end)?;
                }
            }
        }
    }

    /// Scan forward from the current position for the next block whose
    /// header plausibly points at a parseable chunk header, reporting the
    /// bridged region. Returns `None` if no random access is available or
    /// no resumption point is found before end-of-file.
    pub fn recover(&mut self) -> Result<Option<SkippedRegion>> {
        if !self.source.supports_random_access() {
            return Ok(None);
        }
        let begin = self.position();
        let mut probe = (begin / BLOCK_SIZE + 1) * BLOCK_SIZE;
        loop {
            if let Some(size) = self.source.size() {
                if probe >= size {
                    return Ok(None);
                }
            }
            if self.seek(probe).is_err() {
                return Ok(None);
            }
            let header_bytes = match self.read_raw_exact(BLOCK_HEADER_SIZE) {
                Ok(b) => b,
                Err(_) => return Ok(None),
            };
            let mut arr = [0u8; BLOCK_HEADER_SIZE];
            arr.copy_from_slice(&header_bytes);
            if let Some(block_header) = BlockHeader::from_bytes(&arr) {
                // Try `probe` itself first: whenever a chunk starts exactly at
                // this block boundary, that's already the real resync point,
                // regardless of what `next_chunk_offset` says. Only fall back
                // to the pointer when that direct attempt doesn't parse.
                for candidate in [probe, probe + block_header.next_chunk_offset] {
                    if self.seek(candidate).is_ok() {
                        if let Ok(Some((resume_begin, _header))) = self.pull_chunk_header() {
                            self.seek(resume_begin)?;
                            log::warn!(
                                "chunk reader recovery: skipped [{}, {})",
                                begin,
                                resume_begin
                            );
                            return Ok(Some(SkippedRegion {
                                begin,
                                end: resume_begin,
                                reason: "corrupted region skipped to next block boundary".into(),
                            }));
                        }
                    }
                }
            }
            probe += BLOCK_SIZE;
        }
    }
}
