//! Peekable readers for sniff-then-stream workflows.
//!
//! Thin convenience wrapper around standard library I/O primitives
//! ([`Read::take`], [`Cursor`], [`Chain`]) so that the first few bytes of a
//! stream can be inspected without seeking and then replayed.

use crate::error::{ErrorKind, Result};
use crate::{Compression, SNIFF_LENGTH};
use exn::ResultExt;
use std::io::{Chain, Cursor, Read};

/// A resumable [`Read`]er for peek-decide-stream workflows.
///
/// Read enough data to inspect (e.g. compression magic bytes), then stream
/// the full content onward via [`into_reader`](Self::into_reader), or drop to
/// discard.
pub struct PeekableReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    /// Wrap any reader for peeking.
    pub fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new() }
    }

    /// Read up to `limit` bytes of the stream.
    ///
    /// Returns a slice of buffered data. Successive calls do not accumulate:
    /// - `peek(4)` puts 4 bytes in the buffer, returns 4 bytes
    /// - `peek(6)` puts an additional 2 bytes in the buffer, returns 6 bytes
    /// - `peek(2)` immediately returns 2 bytes (because buffer already has 6)
    pub fn peek(&mut self, limit: usize) -> Result<&[u8]> {
        if self.buffer.len() >= limit {
            return Ok(&self.buffer[..limit]);
        }
        let needed = (limit - self.buffer.len()) as u64;
        (&mut self.inner).take(needed).read_to_end(&mut self.buffer).or_raise(|| ErrorKind::Io)?;
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// Convert into a [`Read`]er that replays the buffered head, then
    /// streams the remaining input.
    pub fn into_reader(self) -> Chain<Cursor<Vec<u8>>, R> {
        Cursor::new(self.buffer).chain(self.inner)
    }
}

impl Compression {
    /// Sniff the compression format of a raw stream and return a reader over
    /// its decompressed content.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use xmandump_compress::Compression;
    /// use std::fs::File;
    /// use std::io::BufReader;
    ///
    /// let file = BufReader::new(File::open("coreutils-9.4_1.x86_64.xbps").unwrap());
    /// let (format, mut tarball) = Compression::detect_reader(file).unwrap();
    /// println!("package compressed with {format}");
    /// std::io::copy(&mut tarball, &mut std::io::sink()).unwrap();
    /// ```
    pub fn detect_reader<'a, R: Read + 'a>(reader: R) -> Result<(Self, Box<dyn Read + 'a>)> {
        let mut peekable = PeekableReader::new(reader);
        let format = Self::sniff(peekable.peek(SNIFF_LENGTH)?)?;
        let decoder = format.wrap_reader(peekable.into_reader())?;
        Ok((format, decoder))
    }
}
