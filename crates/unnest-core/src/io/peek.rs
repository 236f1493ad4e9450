//! Header peeking without losing bytes.

use std::io;
use std::io::Read;

/// Reader that replays a peeked header before continuing with the source.
///
/// Format detection needs the first few hundred bytes of a stream that may not
/// be seekable. `PeekReader` reads them up front and hands them back on
/// the first reads, so the peek is invisible to later consumers.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use unnest_core::io::PeekReader;
///
/// let mut reader = PeekReader::new(&b"hello world"[..], 5)?;
/// assert_eq!(reader.header(), b"hello");
///
/// let mut all = String::new();
/// reader.read_to_string(&mut all)?;
/// assert_eq!(all, "hello world");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct PeekReader<R> {
    header: Vec<u8>,
    pos: usize,
    inner: R,
}

impl<R: Read> PeekReader<R> {
    /// Peeks up to `len` bytes from `inner`.
    ///
    /// Fewer bytes are kept if the source ends early; an empty source gives
    /// an empty header.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the header fails.
    pub fn new(mut inner: R, len: usize) -> io::Result<Self> {
        let mut header = Vec::with_capacity(len);
        inner.by_ref().take(len as u64).read_to_end(&mut header)?;
        Ok(Self {
            header,
            pos: 0,
            inner,
        })
    }
}

impl<R> PeekReader<R> {
    /// The peeked bytes, regardless of how much has been read since.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Returns `true` if the source was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.header.len() {
            let remaining = &self.header[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}
