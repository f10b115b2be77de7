//! Component D: the user-facing state machine. Multiplexes the chunk
//! reader and chunk decoder, tracks position, and drives recovery.
//!
//! Errors surfaced by the lower layers never unwind past this type: they
//! are captured as a `Failed(recoverable, reason)` state (mirroring the
//! teacher's return-code-plus-side-channel convention, modeled here as a
//! state enum instead of a second out-parameter) and retried only when the
//! caller explicitly calls [`RecordReader::recover`].

use crate::byte_source::ByteSource;
use crate::chunk::ChunkType;
use crate::chunk_decoder::ChunkDecoder;
use crate::chunk_reader::{ChunkReader, SkippedRegion};
use crate::error::{RecoverableAt, Result, RiegeliError};
use crate::metadata::RecordsMetadata;
use crate::options::ReaderOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPosition {
    pub chunk_begin: u64,
    pub record_index: u64,
}

enum State {
    Healthy,
    Failed { recoverable: RecoverableAt, reason: String },
}

pub struct RecordReader<S: ByteSource> {
    chunk_reader: ChunkReader<S>,
    options: ReaderOptions,
    current_chunk_begin: u64,
    decoder: Option<ChunkDecoder>,
    state: State,
}

impl<S: ByteSource> RecordReader<S> {
    pub fn new(source: S, options: ReaderOptions) -> Self {
        Self {
            chunk_reader: ChunkReader::new(source),
            options,
            current_chunk_begin: 0,
            decoder: None,
            state: State::Healthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.state, State::Healthy)
    }

    pub fn recoverable(&self) -> RecoverableAt {
        match &self.state {
            State::Healthy => RecoverableAt::No,
            State::Failed { recoverable, .. } => *recoverable,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            State::Healthy => None,
            State::Failed { reason, .. } => Some(reason),
        }
    }

    pub fn pos(&self) -> RecordPosition {
        RecordPosition {
            chunk_begin: self.current_chunk_begin,
            record_index: self.decoder.as_ref().map_or(0, |d| d.index()),
        }
    }

    pub fn size(&self) -> Option<u64> {
        self.chunk_reader.size()
    }

    pub fn supports_random_access(&self) -> bool {
        self.chunk_reader.supports_random_access()
    }

    fn fail(&mut self, recoverable: RecoverableAt, reason: String) {
        log::warn!("record reader entering failed state ({recoverable:?}): {reason}");
        self.state = State::Failed { recoverable, reason };
    }

    pub fn check_file_format(&mut self) -> bool {
        self.chunk_reader.check_file_format().unwrap_or(false)
    }

    /// Requires the reader be at byte 0 (nothing read yet). Reads the
    /// signature chunk, peeks the following one, and consumes it as
    /// metadata if it is a `FileMetadata` chunk; otherwise leaves the
    /// reader positioned at that chunk's start and returns default
    /// metadata.
    pub fn read_metadata(&mut self, out: &mut RecordsMetadata) -> Result<bool> {
        if self.chunk_reader.position() != 0 {
            return Err(RiegeliError::FailedPrecondition(
                "read_metadata requires the reader to be at its initial position".into(),
            ));
        }
        if !self.chunk_reader.check_file_format()? {
            return Err(RiegeliError::data_loss(
                "file does not start with a valid FileSignature chunk",
                RecoverableAt::No,
            ));
        }
        match self.chunk_reader.pull_chunk_header()? {
            Some((begin, header)) if header.chunk_type == ChunkType::FileMetadata => {
                let chunk = self.chunk_reader.read_chunk_payload(begin, header)?;
                let decoder = ChunkDecoder::decode(&chunk, None)?;
                let mut decoder = match decoder {
                    ChunkDecoder::Transposed(d) => d,
                    ChunkDecoder::Simple(_) => {
                        return Err(RiegeliError::data_loss(
                            "FileMetadata chunk was not transposed-encoded",
                            RecoverableAt::No,
                        ))
                    }
                };
                let bytes = decoder.read_record()?.unwrap_or_default();
                *out = RecordsMetadata::decode(&bytes)?;
                self.current_chunk_begin = self.chunk_reader.position();
                Ok(true)
            }
            Some((begin, _header)) => {
                if !self.options.tolerate_missing_metadata {
                    return Err(RiegeliError::data_loss(
                        "missing FileMetadata chunk",
                        RecoverableAt::No,
                    ));
                }
                if self.chunk_reader.supports_random_access() {
                    self.chunk_reader.seek(begin)?;
                }
                *out = RecordsMetadata::default();
                self.current_chunk_begin = begin;
                Ok(true)
            }
            None => {
                *out = RecordsMetadata::default();
                self.current_chunk_begin = self.chunk_reader.position();
                Ok(true)
            }
        }
    }

    /// Returns the next record and its position, or `None` at either clean
    /// end-of-file or a newly failed state — callers distinguish the two
    /// via [`Self::is_healthy`].
    pub fn read_record(&mut self) -> Option<(Vec<u8>, RecordPosition)> {
        loop {
            if let Some(decoder) = &mut self.decoder {
                match decoder.read_record() {
                    Ok(Some(bytes)) => {
                        let pos = RecordPosition {
                            chunk_begin: self.current_chunk_begin,
                            record_index: decoder.index() - 1,
                        };
                        return Some((bytes, pos));
                    }
                    Ok(None) => {
                        self.decoder = None;
                    }
                    Err(e) => {
                        let recoverable = e.recoverable();
                        self.fail(recoverable, e.to_string());
                        return None;
                    }
                }
            }
            match self.chunk_reader.read_chunk() {
                Ok(Some(chunk)) => {
                    self.current_chunk_begin = chunk.chunk_begin;
                    match ChunkDecoder::decode(&chunk, self.options.projection.as_ref()) {
                        Ok(decoder) => self.decoder = Some(decoder),
                        Err(e) => {
                            self.fail(e.recoverable(), e.to_string());
                            return None;
                        }
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    self.fail(e.recoverable(), e.to_string());
                    return None;
                }
            }
        }
    }

    pub fn seek_to_record(&mut self, target: RecordPosition) -> Result<()> {
        self.state = State::Healthy;
        if target.chunk_begin == self.current_chunk_begin {
            if target.record_index == 0 {
                self.decoder = None;
                return Ok(());
            }
            if let Some(decoder) = &mut self.decoder {
                decoder.set_index(target.record_index);
                return Ok(());
            }
        } else {
            self.chunk_reader.seek(target.chunk_begin)?;
            self.current_chunk_begin = target.chunk_begin;
            if target.record_index == 0 {
                self.decoder = None;
                return Ok(());
            }
        }
        match self.chunk_reader.read_chunk()? {
            Some(chunk) => {
                let mut decoder = ChunkDecoder::decode(&chunk, self.options.projection.as_ref())?;
                decoder.set_index(target.record_index);
                self.decoder = Some(decoder);
            }
            None => self.decoder = None,
        }
        Ok(())
    }

    pub fn seek_to_byte(&mut self, p: u64) -> Result<()> {
        self.state = State::Healthy;
        let in_current_read_chunk =
            self.decoder.is_some() && p >= self.current_chunk_begin && p <= self.chunk_reader.position();
        if !in_current_read_chunk {
            let begin = self.chunk_reader.seek_to_chunk_containing(p)?;
            self.current_chunk_begin = begin;
            if begin > p {
                self.decoder = None;
                return Ok(());
            }
            match self.chunk_reader.read_chunk()? {
                Some(chunk) => {
                    self.decoder = Some(ChunkDecoder::decode(&chunk, self.options.projection.as_ref())?);
                }
                None => {
                    self.decoder = None;
                    return Ok(());
                }
            }
        }
        let num_records = self.decoder.as_ref().map_or(0, |d| d.num_records());
        let idx = (p - self.current_chunk_begin).min(num_records);
        if let Some(decoder) = &mut self.decoder {
            decoder.set_index(idx);
        }
        Ok(())
    }

    /// Explicit recovery request, valid only when the reader is in a
    /// failed state. Returns the bridged region on success.
    pub fn recover(&mut self) -> Option<SkippedRegion> {
        let (recoverable, reason) = match &self.state {
            State::Healthy => return None,
            State::Failed { recoverable, reason } => (*recoverable, reason.clone()),
        };

        let region = match recoverable {
            RecoverableAt::No => None,
            RecoverableAt::ChunkReader => {
                self.decoder = None;
                match self.chunk_reader.recover() {
                    Ok(Some(region)) => {
                        self.current_chunk_begin = region.end;
                        Some(region)
                    }
                    _ => None,
                }
            }
            RecoverableAt::ChunkDecoder => {
                // Records already emitted from this chunk (`index_before` of
                // them) were genuinely delivered, not skipped — only the
                // decoder's position past them through the failing read is
                // bridged.
                let index_before = self.decoder.as_ref().map_or(0, |d| d.index());
                let begin = self.current_chunk_begin + index_before;
                let recovered = self.decoder.as_mut().map(|d| d.recover()).unwrap_or(false);
                if !recovered {
                    self.decoder = None;
                }
                let end = self.chunk_reader.position();
                Some(SkippedRegion {
                    begin,
                    end,
                    reason: reason.clone(),
                })
            }
        };

        match &region {
            Some(r) => {
                let accept = match &mut self.options.recovery_callback {
                    Some(cb) => cb(r),
                    None => true,
                };
                if accept {
                    self.state = State::Healthy;
                    region
                } else {
                    self.state = State::Failed { recoverable, reason };
                    None
                }
            }
            None => {
                self.state = State::Healthy;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::SliceSource;
    use crate::testutil::FixtureWriter;

    #[test]
    fn reads_three_simple_records() {
        let mut w = FixtureWriter::new();
        w.add_signature();
        w.add_simple_chunk(&[b"a", b"", b"hello"]);
        let bytes = w.finish();

        let mut reader = RecordReader::new(SliceSource::new(bytes), ReaderOptions::default());
        assert!(reader.check_file_format());
        let (r0, p0) = reader.read_record().unwrap();
        assert_eq!(r0, b"a");
        assert_eq!(p0.record_index, 0);
        let chunk_begin = p0.chunk_begin;
        let (r1, p1) = reader.read_record().unwrap();
        assert_eq!(r1, b"");
        assert_eq!(p1.chunk_begin, chunk_begin);
        let (r2, _) = reader.read_record().unwrap();
        assert_eq!(r2, b"hello");
        assert!(reader.read_record().is_none());
        assert!(reader.is_healthy());
    }

    #[test]
    fn seek_to_record_position() {
        let mut w = FixtureWriter::new();
        w.add_signature();
        w.add_simple_chunk(&[b"a", b"b", b"c"]);
        let bytes = w.finish();

        let mut reader = RecordReader::new(SliceSource::new(bytes), ReaderOptions::default());
        reader.check_file_format();
        let (_, p0) = reader.read_record().unwrap();
        let (_, p1) = reader.read_record().unwrap();
        let (_, _p2) = reader.read_record().unwrap();

        reader.seek_to_record(p1).unwrap();
        let (record, pos) = reader.read_record().unwrap();
        assert_eq!(record, b"b");
        assert_eq!(pos, p1);
        assert_eq!(p0.chunk_begin, p1.chunk_begin);
    }

    #[test]
    fn empty_file_has_no_records() {
        let reader_source = SliceSource::new(Vec::new());
        let mut reader = RecordReader::new(reader_source, ReaderOptions::default());
        assert!(!reader.check_file_format());
        assert!(reader.read_record().is_none());
    }
}
