//! Compression codec support.
//!
//! A codec is a 1:1 transform: one compressed stream in, one decompressed
//! stream out. The recursive opener wraps the compressed stream in the
//! codec's decoder and treats the output as a new stream one level deeper.
//!
//! - **Gzip**: multi-member streams are decoded in full
//! - **Bzip2**: concatenated streams are decoded in full
//! - **Xz**: concatenated streams are decoded in full
//! - **Zstd**: multiple frames are decoded in full

use std::io::Read;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use xz2::read::XzDecoder;

use crate::Result;

/// Compression codec for single-stream compressed data.
///
/// # Examples
///
/// ```
/// use unnest_core::formats::compression::CompressionCodec;
///
/// assert_eq!(CompressionCodec::Gzip.name(), "gzip");
/// assert_eq!(CompressionCodec::Zstd.name(), "zstd");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// `1F 8B`, possibly several members back to back.
    Gzip,
    /// `BZh`, possibly several streams back to back.
    Bzip2,
    /// `FD 37 7A 58 5A 00`.
    Xz,
    /// `28 B5 2F FD`, one or more frames.
    Zstd,
}

impl CompressionCodec {
    /// Short name used in log fields.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Wraps `reader` in this codec's decoder.
    ///
    /// Decoding is lazy; corrupt data surfaces as an I/O error on read.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be initialized (zstd allocates
    /// its context up front).
    pub fn decoder<'a>(self, reader: impl Read + 'a) -> Result<Box<dyn Read + 'a>> {
        let decoder: Box<dyn Read + 'a> = match self {
            Self::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        };
        Ok(decoder)
    }
}
