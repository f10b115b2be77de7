//! Minimal protobuf wire-format primitives: tags, varints, and
//! length-delimited framing. Not a protobuf runtime — no message
//! descriptors, no generated code, no support for unknown wire types beyond
//! the three this format actually stores.
//!
//! Varint encode/decode is delegated to `integer-encoding`, the same crate
//! `other_examples`' forest `car-plain.rs` readers use for their own
//! varint-framed records.

use std::io::{self, Read, Write};

use integer_encoding::{VarInt, VarIntReader, VarIntWriter};

use crate::error::{RecoverableAt, Result, RiegeliError};

/// The three protobuf wire kinds this format round-trips. `Varint` covers
/// protobuf's varint (0) and zigzag-sint wire types (both decode as a raw
/// varint at this layer); `Fixed32`/`Fixed64` and `LengthDelimited` map onto
/// protobuf wire types 5, 1, and 2 respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Varint,
    Fixed32,
    Fixed64,
    LengthDelimited,
}

impl WireKind {
    pub fn to_byte(self) -> u8 {
        match self {
            WireKind::Varint => 0,
            WireKind::Fixed32 => 1,
            WireKind::Fixed64 => 2,
            WireKind::LengthDelimited => 3,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(WireKind::Varint),
            1 => Some(WireKind::Fixed32),
            2 => Some(WireKind::Fixed64),
            3 => Some(WireKind::LengthDelimited),
            _ => None,
        }
    }

    /// Protobuf's own wire-type numbering, used when assembling tags.
    fn protobuf_wire_type(self) -> u64 {
        match self {
            WireKind::Varint => 0,
            WireKind::Fixed64 => 1,
            WireKind::LengthDelimited => 2,
            WireKind::Fixed32 => 5,
        }
    }
}

fn data_loss(reason: impl Into<String>) -> RiegeliError {
    RiegeliError::data_loss(reason, RecoverableAt::ChunkDecoder)
}

/// Write a protobuf tag (`field_number << 3 | wire_type`) as a varint.
pub fn write_tag(out: &mut Vec<u8>, field_number: u64, kind: WireKind) {
    let tag = (field_number << 3) | kind.protobuf_wire_type();
    write_varint(out, tag);
}

/// Read a tag, splitting it back into field number and wire kind.
pub fn read_tag(buf: &[u8]) -> Result<(u64, WireKind, usize)> {
    let (tag, n) = read_varint(buf)?;
    let field_number = tag >> 3;
    let kind = match tag & 0x7 {
        0 => WireKind::Varint,
        1 => WireKind::Fixed64,
        2 => WireKind::LengthDelimited,
        5 => WireKind::Fixed32,
        other => return Err(data_loss(format!("unsupported protobuf wire type {other}"))),
    };
    Ok((field_number, kind, n))
}

pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    let start = out.len();
    out.resize(start + value.required_space(), 0);
    value.encode_var(&mut out[start..]);
}

pub fn read_varint(buf: &[u8]) -> Result<(u64, usize)> {
    u64::decode_var(buf).ok_or_else(|| data_loss("truncated varint"))
}

pub fn read_varint_from<R: Read>(r: &mut R) -> io::Result<u64> {
    r.read_varint()
}

pub fn write_varint_to<W: Write>(w: &mut W, value: u64) -> io::Result<usize> {
    w.write_varint(value)
}

pub fn write_length_delimited(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Read a varint length prefix followed by that many bytes, returning the
/// slice and the number of bytes consumed (prefix + payload).
pub fn read_length_delimited(buf: &[u8]) -> Result<(&[u8], usize)> {
    let (len, prefix_len) = read_varint(buf)?;
    let len = len as usize;
    let total = prefix_len
        .checked_add(len)
        .ok_or_else(|| RiegeliError::Overflow("length-delimited value too large".into()))?;
    if buf.len() < total {
        return Err(RiegeliError::truncated(
            "length-delimited value runs past buffer end",
            RecoverableAt::ChunkDecoder,
        ));
    }
    Ok((&buf[prefix_len..total], total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn varint_roundtrip() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            write_varint(&mut out, v);
            let (parsed, n) = read_varint(&out).unwrap();
            assert_eq!(parsed, v);
            assert_eq!(n, out.len());
        }
    }

    #[test]
    fn tag_roundtrip() {
        let mut out = Vec::new();
        write_tag(&mut out, 42, WireKind::LengthDelimited);
        let (field, kind, _) = read_tag(&out).unwrap();
        assert_eq!(field, 42);
        assert_eq!(kind, WireKind::LengthDelimited);
    }

    #[test]
    fn length_delimited_roundtrip() {
        let mut out = Vec::new();
        write_length_delimited(&mut out, b"hello");
        let (slice, consumed) = read_length_delimited(&out).unwrap();
        assert_eq!(slice, b"hello");
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn truncated_varint_is_data_loss() {
        let buf = [0x80u8]; // continuation bit set, no terminating byte
        assert!(read_varint(&buf).is_err());
    }

    proptest! {
        #[test]
        fn varint_roundtrips_for_any_u64(v: u64) {
            let mut out = Vec::new();
            write_varint(&mut out, v);
            let (parsed, n) = read_varint(&out).unwrap();
            prop_assert_eq!(parsed, v);
            prop_assert_eq!(n, out.len());
        }

        #[test]
        fn length_delimited_roundtrips_for_any_bytes(bytes: Vec<u8>) {
            let mut out = Vec::new();
            write_length_delimited(&mut out, &bytes);
            let (slice, consumed) = read_length_delimited(&out).unwrap();
            prop_assert_eq!(slice, bytes.as_slice());
            prop_assert_eq!(consumed, out.len());
        }

        /// Mirrors `SimpleDecoder`'s size table: an arbitrary list of record
        /// lengths, varint-encoded back to back, must read back identically
        /// regardless of how many records or how large each one is.
        #[test]
        fn simple_chunk_size_table_roundtrips(sizes: Vec<u32>) {
            let mut out = Vec::new();
            for &s in &sizes {
                write_varint(&mut out, s as u64);
            }
            let mut pos = 0;
            let mut decoded = Vec::with_capacity(sizes.len());
            for _ in 0..sizes.len() {
                let (v, n) = read_varint(&out[pos..]).unwrap();
                decoded.push(v as u32);
                pos += n;
            }
            prop_assert_eq!(decoded, sizes);
            prop_assert_eq!(pos, out.len());
        }
    }
}
