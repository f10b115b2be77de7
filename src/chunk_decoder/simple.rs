//! Simple-chunk decoding: `[compression_type][varint sizes][compressed
//! concatenation]`.

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::pool::CodecPool;
use crate::codec::CompressionType;
use crate::error::{RecoverableAt, Result, RiegeliError};
use crate::wire::read_varint;

fn data_loss(reason: impl Into<String>) -> RiegeliError {
    RiegeliError::data_loss(reason, RecoverableAt::ChunkDecoder)
}

pub struct SimpleDecoder {
    records: Vec<Vec<u8>>,
    index: usize,
}

impl SimpleDecoder {
    pub fn decode(
        payload: &[u8],
        num_records: u64,
        decoded_data_size: u64,
        pool: &mut CodecPool,
    ) -> Result<Self> {
        if payload.len() < 4 {
            return Err(data_loss("simple chunk payload shorter than compression_type field"));
        }
        let raw_ty = LittleEndian::read_u32(&payload[0..4]);
        let ty = CompressionType::from_u32(raw_ty)
            .ok_or_else(|| data_loss(format!("unknown compression_type {raw_ty:#x}")))?;

        let mut pos = 4usize;
        let mut sizes = Vec::with_capacity(num_records as usize);
        for _ in 0..num_records {
            let (size, n) = read_varint(&payload[pos..])?;
            sizes.push(size);
            pos += n;
        }

        let codec = pool.acquire(ty);
        let decompressed = codec
            .decompress(&payload[pos..])
            .map_err(|e| data_loss(format!("simple chunk decompression failed: {e}")))?;
        pool.release(codec);
        if decompressed.len() as u64 != decoded_data_size {
            return Err(data_loss(format!(
                "decoded size {} does not match header's decoded_data_size {}",
                decompressed.len(),
                decoded_data_size
            )));
        }

        let mut records = Vec::with_capacity(num_records as usize);
        let mut off = 0usize;
        for size in sizes {
            let size = size as usize;
            let end = off
                .checked_add(size)
                .ok_or_else(|| RiegeliError::Overflow("record size overflow".into()))?;
            if end > decompressed.len() {
                return Err(data_loss("size table runs past decoded payload"));
            }
            records.push(decompressed[off..end].to_vec());
            off = end;
        }

        Ok(Self { records, index: 0 })
    }

    pub fn read_record(&mut self) -> Option<Vec<u8>> {
        let r = self.records.get(self.index)?.clone();
        self.index += 1;
        Some(r)
    }

    pub fn set_index(&mut self, i: u64) {
        self.index = (i as usize).min(self.records.len());
    }

    pub fn index(&self) -> u64 {
        self.index as u64
    }

    pub fn num_records(&self) -> u64 {
        self.records.len() as u64
    }

    /// Simple-chunk decompression is monolithic: by the time a failure would
    /// be observed, `decode` has already either produced every record or
    /// none of them. There is nothing partial to salvage here; the whole
    /// chunk is abandoned and recovery moves on to the next one.
    pub fn recover(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::get_codec;

    fn encode_simple(records: &[&[u8]], ty: CompressionType) -> (Vec<u8>, u64) {
        let codec = get_codec(ty);
        let concatenated: Vec<u8> = records.iter().flat_map(|r| r.to_vec()).collect();
        let compressed = codec.compress(&concatenated, 3).unwrap();
        let mut payload = Vec::new();
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, ty.to_u32());
        payload.extend_from_slice(&buf);
        for r in records {
            crate::wire::write_varint(&mut payload, r.len() as u64);
        }
        payload.extend_from_slice(&compressed);
        (payload, concatenated.len() as u64)
    }

    #[test]
    fn decode_uncompressed() {
        let records: &[&[u8]] = &[b"a", b"", b"hello"];
        let (payload, decoded_size) = encode_simple(records, CompressionType::None);
        let mut pool = CodecPool::new();
        let mut decoder = SimpleDecoder::decode(&payload, 3, decoded_size, &mut pool).unwrap();
        assert_eq!(decoder.read_record().unwrap(), b"a");
        assert_eq!(decoder.read_record().unwrap(), b"");
        assert_eq!(decoder.read_record().unwrap(), b"hello");
        assert!(decoder.read_record().is_none());
    }

    #[test]
    fn decode_zstd_compressed() {
        let records: &[&[u8]] = &[b"repeated repeated repeated", b"data"];
        let (payload, decoded_size) = encode_simple(records, CompressionType::Zstd);
        let mut pool = CodecPool::new();
        let mut decoder = SimpleDecoder::decode(&payload, 2, decoded_size, &mut pool).unwrap();
        assert_eq!(decoder.read_record().unwrap(), records[0]);
        assert_eq!(decoder.read_record().unwrap(), records[1]);
    }

    #[test]
    fn rejects_unknown_compression_type() {
        let mut payload = vec![0u8; 4];
        LittleEndian::write_u32(&mut payload, 0xDEAD_u32);
        let mut pool = CodecPool::new();
        assert!(SimpleDecoder::decode(&payload, 0, 0, &mut pool).is_err());
    }

    #[test]
    fn set_index_and_num_records() {
        let records: &[&[u8]] = &[b"a", b"b", b"c"];
        let (payload, decoded_size) = encode_simple(records, CompressionType::None);
        let mut pool = CodecPool::new();
        let mut decoder = SimpleDecoder::decode(&payload, 3, decoded_size, &mut pool).unwrap();
        assert_eq!(decoder.num_records(), 3);
        decoder.set_index(2);
        assert_eq!(decoder.read_record().unwrap(), b"c");
        decoder.set_index(100);
        assert_eq!(decoder.index(), 3);
    }
}
