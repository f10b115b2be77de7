//! Pull-based seekable byte access (component A).
//!
//! Mirrors the teacher's choice to stay generic over `Read + Seek`
//! (`SixCyReader<R: Read + Seek>`) rather than reach for a streaming/bytes
//! crate: the trait here is a small capability set (`pull`, `cursor_advance`,
//! `position`, `size`, `seek`, `supports_random_access`) implemented by two
//! concrete adapters, [`FileSource`] and [`SliceSource`].
//!
//! `pull` borrows from `&mut self` the same way `std::io::BufRead::fill_buf`
//! does — no GAT is needed because the borrow's lifetime is tied to the
//! method receiver, not to an associated type.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Pull-based byte source. A single in-process buffer of at least
/// `min_bytes` is returned by `pull`; `cursor_advance` consumes a prefix of
/// it. Implementations may internally read ahead.
pub trait ByteSource {
    /// Ensure at least `min_bytes` are buffered (or as many as remain before
    /// EOF) and return a view of the buffered region starting at the current
    /// cursor. An empty slice means EOF with nothing left to deliver.
    fn pull(&mut self, min_bytes: usize) -> io::Result<&[u8]>;

    /// Consume `n` bytes from the front of the buffered region. `n` must not
    /// exceed the length of the slice last returned by `pull`.
    fn cursor_advance(&mut self, n: usize);

    /// Current absolute byte position in the source.
    fn position(&self) -> u64;

    /// Total size in bytes, if known up front.
    fn size(&self) -> Option<u64>;

    /// Absolute seek. Only valid if `supports_random_access()`.
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    fn supports_random_access(&self) -> bool;
}

const DEFAULT_READ_AHEAD: usize = 64 * 1024;

/// A file-backed, random-access byte source.
pub struct FileSource {
    inner: File,
    size: u64,
    pos: u64,
    buf: Vec<u8>,
    buf_start: u64,
}

impl FileSource {
    pub fn new(inner: File) -> io::Result<Self> {
        let size = inner.metadata()?.len();
        Ok(Self {
            inner,
            size,
            pos: 0,
            buf: Vec::new(),
            buf_start: 0,
        })
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl ByteSource for FileSource {
    fn pull(&mut self, min_bytes: usize) -> io::Result<&[u8]> {
        let have = (self.buf_start + self.buf.len() as u64).saturating_sub(self.pos) as usize;
        if have < min_bytes {
            // Re-fill: keep unread suffix, read ahead from the file.
            let unread_off = (self.pos - self.buf_start) as usize;
            let mut remainder = self.buf.split_off(unread_off.min(self.buf.len()));
            self.inner.seek(SeekFrom::Start(self.pos))?;
            let want = min_bytes.max(DEFAULT_READ_AHEAD);
            let mut extra = vec![0u8; want];
            let mut filled = 0;
            loop {
                let n = self.inner.read(&mut extra[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
                if filled >= min_bytes {
                    break;
                }
            }
            extra.truncate(filled);
            remainder.extend_from_slice(&extra);
            self.buf = remainder;
            self.buf_start = self.pos;
        }
        let off = (self.pos - self.buf_start) as usize;
        Ok(&self.buf[off.min(self.buf.len())..])
    }

    fn cursor_advance(&mut self, n: usize) {
        self.pos += n as u64;
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> Option<u64> {
        Some(self.size)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos;
        // Invalidate buffer; next pull re-fills from `pos`.
        self.buf.clear();
        self.buf_start = pos;
        Ok(())
    }

    fn supports_random_access(&self) -> bool {
        true
    }
}

/// An owned in-memory byte source. Always random-access.
pub struct SliceSource {
    data: Vec<u8>,
    pos: u64,
}

impl SliceSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for SliceSource {
    fn pull(&mut self, _min_bytes: usize) -> io::Result<&[u8]> {
        let pos = self.pos.min(self.data.len() as u64) as usize;
        Ok(&self.data[pos..])
    }

    fn cursor_advance(&mut self, n: usize) {
        self.pos += n as u64;
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn supports_random_access(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_pull_advance() {
        let mut s = SliceSource::new(b"hello world".to_vec());
        assert_eq!(s.pull(5).unwrap(), b"hello world");
        s.cursor_advance(6);
        assert_eq!(s.pull(1).unwrap(), b"world");
        assert_eq!(s.position(), 6);
    }

    #[test]
    fn slice_source_seek() {
        let mut s = SliceSource::new(b"0123456789".to_vec());
        s.seek(5).unwrap();
        assert_eq!(s.pull(1).unwrap(), b"56789");
    }

    #[test]
    fn file_source_roundtrip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        f.write_all(b"the quick brown fox").unwrap();
        let mut src = FileSource::open(f.path()).unwrap();
        assert_eq!(src.size(), Some(20));
        let chunk = src.pull(5).unwrap().to_vec();
        assert_eq!(&chunk[..5], b"the q");
        src.cursor_advance(4);
        let rest = src.pull(1).unwrap().to_vec();
        assert!(rest.starts_with(b"uick"));
    }
}
