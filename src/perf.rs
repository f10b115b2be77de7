//! Write buffer.
//!
//! [`WriteBuffer`] accumulates small writes into a fixed-capacity buffer and
//! flushes to the underlying writer in large aligned chunks. Reused by the
//! test fixture writer ([`crate::testutil`]) for bulk record emission.

use std::io::{self, Write};

/// Buffered writer with a configurable flush threshold.
///
/// Unlike `std::io::BufWriter`, this exposes `bytes_written` and bypasses the
/// buffer entirely for writes already at least as large as `capacity`.
pub struct WriteBuffer<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
    pub bytes_written: u64,
}

impl<W: Write> WriteBuffer<W> {
    pub fn new(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
            bytes_written: 0,
        }
    }

    fn flush_if_full(&mut self) -> io::Result<()> {
        if self.buf.len() >= self.capacity {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Write> Write for WriteBuffer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() >= self.capacity {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
            self.inner.write_all(buf)?;
        } else {
            self.buf.extend_from_slice(buf);
            self.flush_if_full()?;
        }
        self.bytes_written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_buffer_flushes() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut wb = WriteBuffer::new(&mut buf, 8);
            wb.write_all(b"hello").unwrap();
            wb.write_all(b" world!").unwrap();
            wb.flush().unwrap();
        }
        assert_eq!(&buf, b"hello world!");
    }

    #[test]
    fn write_buffer_bypasses_for_large_writes() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut wb = WriteBuffer::new(&mut buf, 4);
            wb.write_all(b"this write exceeds capacity").unwrap();
        }
        assert_eq!(&buf, b"this write exceeds capacity");
    }
}
