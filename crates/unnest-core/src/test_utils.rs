//! In-memory fixtures for unit tests, integration tests and benchmarks.
//!
//! Every helper builds its archive in a `Vec<u8>`; nothing touches disk.
//! Helpers unwrap freely because a broken fixture should fail the test
//! that uses it.
//!
//! Only compiled for this crate's own tests or with the `test-utils`
//! feature.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::io::Write;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Builds a tar archive holding one regular file per `(path, content)`.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::create_test_tar;
///
/// let tar = create_test_tar(vec![("app/.env", b"DB_PASSWORD=x")]);
/// assert_eq!(&tar[257..262], b"ustar");
/// ```
#[must_use]
pub fn create_test_tar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut builder = TarTestBuilder::new();
    for (path, data) in entries {
        builder = builder.add_file(path, data);
    }
    builder.build()
}

/// Builds a zip archive holding one stored file per `(path, content)`.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::create_test_zip;
///
/// let zip = create_test_zip(vec![("id_rsa", b"-----BEGIN")]);
/// assert!(zip.starts_with(b"PK\x03\x04"));
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut builder = ZipTestBuilder::new();
    for (path, data) in entries {
        builder = builder.add_file(path, data);
    }
    builder.build()
}

/// Creates an in-memory `ar` archive, the container format of `.deb` files.
///
/// Member names must fit the 16-byte header field.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::create_test_ar;
///
/// let deb = create_test_ar(vec![("debian-binary", b"2.0\n")]);
/// assert!(deb.starts_with(b"!<arch>\n"));
/// ```
#[must_use]
pub fn create_test_ar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut out = b"!<arch>\n".to_vec();
    for (name, data) in entries {
        assert!(name.len() <= 16, "ar member name too long: {name}");
        let header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            name,
            0,
            0,
            0,
            100_644,
            data.len()
        );
        debug_assert_eq!(header.len(), 60);
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
    }
    out
}

/// Creates an in-memory RAR 4 archive holding one stored file per
/// `(path, content)`.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::create_test_rar;
///
/// let rar = create_test_rar(vec![("notes.txt", b"pin=1234")]);
/// assert!(rar.starts_with(b"Rar!\x1a\x07\x00"));
/// ```
#[must_use]
pub fn create_test_rar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut out = b"Rar!\x1a\x07\x00".to_vec();
    // Main header: no flags, two reserved fields
    push_rar_block(&mut out, 0x73, 0x0000, &[0; 6]);

    for (name, data) in entries {
        let size = u32::try_from(data.len()).unwrap();
        let mut fields = Vec::new();
        fields.extend_from_slice(&size.to_le_bytes());
        fields.extend_from_slice(&size.to_le_bytes());
        fields.push(0); // host OS: MS-DOS
        fields.extend_from_slice(&crc32(data).to_le_bytes());
        fields.extend_from_slice(&DOS_TIMESTAMP.to_le_bytes());
        fields.push(20); // version needed to extract
        fields.push(0x30); // method: store
        fields.extend_from_slice(&u16::try_from(name.len()).unwrap().to_le_bytes());
        fields.extend_from_slice(&0x20_u32.to_le_bytes()); // archive attribute
        fields.extend_from_slice(name.as_bytes());

        push_rar_block(&mut out, 0x74, 0x8000, &fields);
        out.extend_from_slice(data);
    }

    push_rar_block(&mut out, 0x7B, 0x4000, &[]);
    out
}

/// Appends one RAR 4 block: 16-bit header CRC, type, flags, size, fields.
fn push_rar_block(out: &mut Vec<u8>, kind: u8, flags: u16, fields: &[u8]) {
    let mut block = vec![kind];
    block.extend_from_slice(&flags.to_le_bytes());
    block.extend_from_slice(&u16::try_from(7 + fields.len()).unwrap().to_le_bytes());
    block.extend_from_slice(fields);

    out.extend_from_slice(&crc32(&block).to_le_bytes()[..2]);
    out.extend_from_slice(&block);
}

/// Builds a single-member zip by hand, with `compressed` as the member's
/// data under compression method id `method`.
///
/// This covers methods the zip writer cannot produce, such as LZMA and
/// Deflate64.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::create_raw_zip;
///
/// // Method 0 is stored, so the data is the content itself
/// let zip = create_raw_zip("a.txt", 0, b"alpha", b"alpha");
/// assert!(zip.starts_with(b"PK\x03\x04"));
/// ```
#[must_use]
pub fn create_raw_zip(name: &str, method: u16, compressed: &[u8], content: &[u8]) -> Vec<u8> {
    let name_len = u16::try_from(name.len()).unwrap();
    let packed = u32::try_from(compressed.len()).unwrap();
    let unpacked = u32::try_from(content.len()).unwrap();
    let crc = crc32(content);

    // Fields shared by the local and central headers, from "version needed"
    let mut common = Vec::new();
    common.extend_from_slice(&63_u16.to_le_bytes());
    common.extend_from_slice(&0_u16.to_le_bytes());
    common.extend_from_slice(&method.to_le_bytes());
    common.extend_from_slice(&DOS_TIMESTAMP.to_le_bytes());
    common.extend_from_slice(&crc.to_le_bytes());
    common.extend_from_slice(&packed.to_le_bytes());
    common.extend_from_slice(&unpacked.to_le_bytes());
    common.extend_from_slice(&name_len.to_le_bytes());
    common.extend_from_slice(&0_u16.to_le_bytes());

    let mut out = b"PK\x03\x04".to_vec();
    out.extend_from_slice(&common);
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(compressed);

    let directory_offset = u32::try_from(out.len()).unwrap();
    out.extend_from_slice(b"PK\x01\x02");
    out.extend_from_slice(&20_u16.to_le_bytes());
    out.extend_from_slice(&common);
    out.extend_from_slice(&[0; 14]); // comment, disk, attributes, offset 0
    out.extend_from_slice(name.as_bytes());
    let directory_size = u32::try_from(out.len()).unwrap() - directory_offset;

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
    out.extend_from_slice(&directory_size.to_le_bytes());
    out.extend_from_slice(&directory_offset.to_le_bytes());
    out.extend_from_slice(&0_u16.to_le_bytes());
    out
}

/// 2024-01-01 00:00 in MS-DOS date/time layout (time in the low half).
const DOS_TIMESTAMP: u32 = 0x5821_0000;

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

/// Gzip-compresses `data`.
#[must_use]
pub fn gzip_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Bzip2-compresses `data`.
#[must_use]
pub fn bzip2_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Xz-compresses `data`.
#[must_use]
pub fn xz_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Zstd-compresses `data`.
#[must_use]
pub fn zstd_compress(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 3).unwrap()
}

/// Wraps `data` in `levels` layers of gzip.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::nested_gzip;
///
/// let onion = nested_gzip(b"core", 3);
/// assert_eq!(&onion[..2], &[0x1F, 0x8B]);
/// ```
#[must_use]
pub fn nested_gzip(data: &[u8], levels: usize) -> Vec<u8> {
    (0..levels).fold(data.to_vec(), |inner, _| gzip_compress(&inner))
}

/// Tar fixture builder covering every entry kind the walker must skip.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::TarTestBuilder;
///
/// let tar = TarTestBuilder::new()
///     .add_directory("etc/")
///     .add_file("etc/shadow", b"root:*:")
///     .add_symlink("passwd", "etc/shadow")
///     .build();
/// ```
pub struct TarTestBuilder {
    inner: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Starts an empty tar archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tar::Builder::new(Vec::new()),
        }
    }

    /// Appends a regular file.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        self.append(path, tar::EntryType::Regular, None, data);
        self
    }

    /// Appends a directory entry.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        self.append(path, tar::EntryType::Directory, None, &[]);
        self
    }

    /// Appends a symbolic link to `target`.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        self.append(path, tar::EntryType::Symlink, Some(target), &[]);
        self
    }

    /// Appends a hard link to `target`.
    #[must_use]
    pub fn add_hardlink(mut self, path: &str, target: &str) -> Self {
        self.append(path, tar::EntryType::Link, Some(target), &[]);
        self
    }

    fn append(&mut self, path: &str, kind: tar::EntryType, link: Option<&str>, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(data.len() as u64);
        header.set_mode(if kind.is_dir() { 0o755 } else { 0o644 });
        if let Some(link) = link {
            header.set_link_name(link).unwrap();
        }
        header.set_cksum();
        self.inner.append_data(&mut header, path, data).unwrap();
    }

    /// Finishes the archive and returns its bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.inner.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Zip fixture builder with stored and deflated members.
///
/// # Examples
///
/// ```
/// use unnest_core::test_utils::ZipTestBuilder;
///
/// let zip = ZipTestBuilder::new()
///     .add_directory("keys/")
///     .add_deflated_file("keys/api.txt", b"sk_live_0000")
///     .build();
/// ```
pub struct ZipTestBuilder {
    writer: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Starts an empty zip archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Appends a stored (uncompressed) member.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_member(path, data, CompressionMethod::Stored)
    }

    /// Appends a deflated member.
    #[must_use]
    pub fn add_deflated_file(self, path: &str, data: &[u8]) -> Self {
        self.add_member(path, data, CompressionMethod::Deflated)
    }

    fn add_member(mut self, path: &str, data: &[u8], method: CompressionMethod) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .unix_permissions(0o644);
        self.writer.start_file(path, options).unwrap();
        self.writer.write_all(data).unwrap();
        self
    }

    /// Appends a directory entry.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        self.writer
            .add_directory(path, SimpleFileOptions::default())
            .unwrap();
        self
    }

    /// Appends a symbolic link to `target`.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        self.writer
            .add_symlink(path, target, SimpleFileOptions::default())
            .unwrap();
        self
    }

    /// Finishes the central directory and returns the archive bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
