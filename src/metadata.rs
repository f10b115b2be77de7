//! `RecordsMetadata`: the message carried by the optional `FileMetadata`
//! chunk. Parsed/assembled with the minimal wire primitives in
//! [`crate::wire`] rather than a generated protobuf type, per the
//! protobuf-runtime non-goal.

use crate::error::{RecoverableAt, Result, RiegeliError};
use crate::wire::{read_tag, read_varint, WireKind};

/// Field numbers as used by upstream Riegeli's `RecordsMetadata` message.
const FIELD_RECORD_TYPE_NAME: u64 = 1;
const FIELD_FILE_DESCRIPTOR: u64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordsMetadata {
    pub record_type_name: Option<String>,
    pub file_descriptors: Vec<Vec<u8>>,
}

impl RecordsMetadata {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(name) = &self.record_type_name {
            crate::wire::write_tag(&mut out, FIELD_RECORD_TYPE_NAME, WireKind::LengthDelimited);
            crate::wire::write_length_delimited(&mut out, name.as_bytes());
        }
        for fd in &self.file_descriptors {
            crate::wire::write_tag(&mut out, FIELD_FILE_DESCRIPTOR, WireKind::LengthDelimited);
            crate::wire::write_length_delimited(&mut out, fd);
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut meta = RecordsMetadata::default();
        let mut pos = 0usize;
        while pos < buf.len() {
            let (field, kind, tag_len) = read_tag(&buf[pos..])?;
            pos += tag_len;
            match (field, kind) {
                (FIELD_RECORD_TYPE_NAME, WireKind::LengthDelimited) => {
                    let (slice, n) = crate::wire::read_length_delimited(&buf[pos..])?;
                    meta.record_type_name = Some(
                        std::str::from_utf8(slice)
                            .map_err(|e| {
                                RiegeliError::data_loss(
                                    format!("record_type_name is not UTF-8: {e}"),
                                    RecoverableAt::ChunkDecoder,
                                )
                            })?
                            .to_string(),
                    );
                    pos += n;
                }
                (FIELD_FILE_DESCRIPTOR, WireKind::LengthDelimited) => {
                    let (slice, n) = crate::wire::read_length_delimited(&buf[pos..])?;
                    meta.file_descriptors.push(slice.to_vec());
                    pos += n;
                }
                (_, WireKind::LengthDelimited) => {
                    let (_, n) = crate::wire::read_length_delimited(&buf[pos..])?;
                    pos += n;
                }
                (_, WireKind::Varint) => {
                    let (_, n) = read_varint(&buf[pos..])?;
                    pos += n;
                }
                (_, WireKind::Fixed32) => pos += 4,
                (_, WireKind::Fixed64) => pos += 8,
            }
        }
        Ok(meta)
    }
}
