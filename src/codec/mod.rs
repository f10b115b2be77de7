//! Compression codec registry.
//!
//! Narrowed from the teacher's five-codec, UUID-identified registry
//! (`CodecId`/`get_codec_by_uuid`, `src/codec/mod.rs`) down to the four
//! codecs this format's on-disk `compression_type` byte names directly —
//! no UUID indirection, since nothing here needs third-party plugin
//! negotiation.

use std::io::{self, Read, Write};
use thiserror::Error;

pub mod pool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    None,
    Brotli,
    Zstd,
    Snappy,
}

impl CompressionType {
    pub fn to_u32(self) -> u32 {
        match self {
            CompressionType::None => 0,
            CompressionType::Brotli => b'b' as u32,
            CompressionType::Zstd => b'z' as u32,
            CompressionType::Snappy => b's' as u32,
        }
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            v if v == b'b' as u32 => Some(CompressionType::Brotli),
            v if v == b'z' as u32 => Some(CompressionType::Zstd),
            v if v == b's' as u32 => Some(CompressionType::Snappy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Brotli => "brotli",
            CompressionType::Zstd => "zstd",
            CompressionType::Snappy => "snappy",
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compression error: {0}")]
    Compression(String),
    #[error("decompression error: {0}")]
    Decompression(String),
    #[error("unknown compression_type: {0}")]
    UnknownType(u32),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub trait Codec: Send + Sync {
    fn compression_type(&self) -> CompressionType;
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::None
    }
    fn compress(&self, data: &[u8], _level: i32) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
}

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::Zstd
    }
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(data, level).map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(data).map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

pub struct BrotliCodec;
impl Codec for BrotliCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::Brotli
    }
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
        let quality = level.clamp(0, 11) as u32;
        let mut out = Vec::new();
        {
            let mut w = brotli::CompressorWriter::new(&mut out, 4096, quality, 22);
            w.write_all(data)
                .map_err(|e| CodecError::Compression(e.to_string()))?;
        }
        Ok(out)
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        brotli::Decompressor::new(data, 4096)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

pub struct SnappyCodec;
impl Codec for SnappyCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::Snappy
    }
    fn compress(&self, data: &[u8], _level: i32) -> Result<Vec<u8>, CodecError> {
        let mut encoder = snap::raw::Encoder::new();
        encoder
            .compress_vec(data)
            .map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = snap::raw::Decoder::new();
        decoder
            .decompress_vec(data)
            .map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

/// Resolve a `compression_type` tag read off disk to a built-in codec.
/// The caller MUST NOT fall back to another codec on a miss — fail hard.
pub fn get_codec(ty: CompressionType) -> Box<dyn Codec> {
    match ty {
        CompressionType::None => Box::new(NoneCodec),
        CompressionType::Zstd => Box::new(ZstdCodec),
        CompressionType::Brotli => Box::new(BrotliCodec),
        CompressionType::Snappy => Box::new(SnappyCodec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_roundtrip() {
        let c = get_codec(CompressionType::None);
        let data = b"hello world";
        let compressed = c.compress(data, 0).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn zstd_roundtrip() {
        let c = get_codec(CompressionType::Zstd);
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = c.compress(&data, 3).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn brotli_roundtrip() {
        let c = get_codec(CompressionType::Brotli);
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = c.compress(&data, 5).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn snappy_roundtrip() {
        let c = get_codec(CompressionType::Snappy);
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = c.compress(&data, 0).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn unknown_type_rejected() {
        assert_eq!(CompressionType::from_u32(0xFF), None);
    }
}
