//! Archive format detection by magic number.

use std::io;
use std::io::Read;

use crate::formats::compression::CompressionCodec;
use crate::io::PeekReader;

/// Number of leading bytes inspected to identify a stream.
pub const HEADER_LEN: usize = 512;

/// MIME label for `ar` archives, which covers Debian packages.
pub const AR_MIME_TYPE: &str = "application/x-unix-archive";

/// MIME label for RPM packages.
pub const RPM_MIME_TYPE: &str = "application/x-rpm";

/// MIME label for unrecognized content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// 7z format magic bytes (signature).
///
/// 7z archives start with the signature: `37 7A BC AF 27 1C`
/// This is the string "7z" followed by format version bytes.
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

const AR_MAGIC: &[u8] = b"!<arch>\n";
const RPM_MAGIC: [u8; 4] = [0xED, 0xAB, 0xEE, 0xDB];
const TAR_MAGIC_OFFSET: usize = 257;

/// Archive formats the generic engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// Gzip stream.
    Gzip,
    /// Bzip2 stream.
    Bzip2,
    /// XZ stream.
    Xz,
    /// Zstandard stream.
    Zstd,
    /// Tar archive (ustar or GNU).
    Tar,
    /// ZIP archive.
    Zip,
    /// 7z archive.
    SevenZ,
    /// RAR archive, version 4 or 5.
    Rar,
}

/// How the recursive opener treats a recognized format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRole {
    /// One compressed stream in, one decompressed stream out.
    Decompressor(CompressionCodec),
    /// A container of named members.
    Extractor,
}

impl ArchiveType {
    /// Returns a short name for logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::SevenZ => "7z",
            Self::Rar => "rar",
        }
    }

    /// Returns the role this format plays during recursion.
    #[must_use]
    pub const fn role(self) -> FormatRole {
        match self {
            Self::Gzip => FormatRole::Decompressor(CompressionCodec::Gzip),
            Self::Bzip2 => FormatRole::Decompressor(CompressionCodec::Bzip2),
            Self::Xz => FormatRole::Decompressor(CompressionCodec::Xz),
            Self::Zstd => FormatRole::Decompressor(CompressionCodec::Zstd),
            Self::Tar | Self::Zip | Self::SevenZ | Self::Rar => FormatRole::Extractor,
        }
    }

    /// Returns the MIME label for this format.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Gzip => "application/gzip",
            Self::Bzip2 => "application/x-bzip2",
            Self::Xz => "application/x-xz",
            Self::Zstd => "application/zstd",
            Self::Tar => "application/x-tar",
            Self::Zip => "application/zip",
            Self::SevenZ => "application/x-7z-compressed",
            Self::Rar => "application/vnd.rar",
        }
    }
}

/// Detects the archive type from the leading bytes of a stream.
///
/// Returns `None` if nothing matches. Truncated input never panics.
///
/// # Examples
///
/// ```
/// use unnest_core::formats::detect::ArchiveType;
/// use unnest_core::formats::detect::detect_format;
///
/// assert_eq!(detect_format(&[0x1F, 0x8B, 0x08]), Some(ArchiveType::Gzip));
/// assert_eq!(detect_format(b"plain text"), None);
/// ```
#[must_use]
pub fn detect_format(data: &[u8]) -> Option<ArchiveType> {
    match data {
        [0x1F, 0x8B, ..] => Some(ArchiveType::Gzip),
        [b'B', b'Z', b'h', b'1'..=b'9', ..] => Some(ArchiveType::Bzip2),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(ArchiveType::Xz),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => Some(ArchiveType::Zstd),
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] => Some(ArchiveType::Zip),
        [b'R', b'a', b'r', b'!', 0x1A, 0x07, ..] => Some(ArchiveType::Rar),
        _ if data.starts_with(&SEVENZ_MAGIC) => Some(ArchiveType::SevenZ),
        _ if is_tar_header(data) => Some(ArchiveType::Tar),
        _ => None,
    }
}

/// Matches both POSIX `ustar\0` and GNU `ustar  \0` headers.
fn is_tar_header(data: &[u8]) -> bool {
    data.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5) == Some(b"ustar".as_slice())
}

/// Returns a MIME label for the leading bytes of a stream.
///
/// Besides the formats the generic engine walks, this recognizes `ar` and
/// RPM packages, which need external tools. Anything else is
/// [`OCTET_STREAM`].
///
/// # Examples
///
/// ```
/// use unnest_core::formats::detect::AR_MIME_TYPE;
/// use unnest_core::formats::detect::classify;
///
/// assert_eq!(classify(b"!<arch>\ndebian-binary"), AR_MIME_TYPE);
/// assert_eq!(classify(b"!<ar"), "application/octet-stream");
/// ```
#[must_use]
pub fn classify(data: &[u8]) -> &'static str {
    if data.starts_with(AR_MAGIC) {
        return AR_MIME_TYPE;
    }
    if data.starts_with(&RPM_MAGIC) {
        return RPM_MIME_TYPE;
    }
    detect_format(data).map_or(OCTET_STREAM, ArchiveType::mime_type)
}

/// Result of probing a stream.
#[derive(Debug)]
pub struct Identified<R> {
    /// Detected format, or `None` for leaf content.
    pub format: Option<ArchiveType>,
    /// Reader that still yields every byte of the stream.
    pub reader: PeekReader<R>,
}

/// Inspects the first [`HEADER_LEN`] bytes of `reader` for a known format.
///
/// # Errors
///
/// Returns an error if reading the header fails.
pub fn identify<R: Read>(reader: R) -> io::Result<Identified<R>> {
    let reader = PeekReader::new(reader, HEADER_LEN)?;
    let format = detect_format(reader.header());
    Ok(Identified { format, reader })
}
