//! Decompression with content-based format detection.
//!
//! XBPS package archives are tarballs compressed with either XZ or Zstd, and
//! the file name says nothing about which one. This crate wraps both codecs
//! behind a closed [`Compression`] enum, providing:
//!
//! - **Format detection** from magic bytes ([`Compression::from_magic_bytes`],
//!   [`Compression::sniff`])
//! - **Streaming** decompression via wrapped readers ([`Compression::wrap_reader`])
//! - **Sniff-then-stream** workflows via [`PeekableReader`]: read just enough of
//!   the raw stream to identify the codec, then replay it through the decoder
//!   ([`Compression::detect_reader`])
//! - **In-memory** helpers ([`Compression::compress`], [`Compression::decompress`])
//!   mostly used to build fixtures.
//!
//! Anything that is neither XZ nor Zstd is rejected with
//! [`ErrorKind::UnsupportedFormat`](crate::error::ErrorKind::UnsupportedFormat).

mod construct;
pub mod error;
mod ops;
mod peekable;
mod util;

pub use crate::construct::SNIFF_LENGTH;
pub use crate::peekable::PeekableReader;

/// A supported package compression format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    /// XZ/LZMA2 compression (.xz)
    Xz,
    /// Zstd compression (.zst)
    Zstd,
}
