//! ZIP archive format handler.

use std::io::Cursor;

use crate::Result;

use super::traits::ContainerFormat;
use super::traits::MemberVisitor;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// ZIP archive walker over materialized bytes.
///
/// The central directory sits at the end of the file, so ZIP needs random
/// access. The caller materializes the archive through the bounded reader
/// first. Stored, Deflate, Deflate64, bzip2, LZMA and zstd members are
/// decoded.
pub struct ZipContainer {
    archive: ::zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl ZipContainer {
    /// Opens a ZIP archive from memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the central directory cannot be parsed.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let archive = ::zip::ZipArchive::new(Cursor::new(data))?;
        Ok(Self { archive })
    }
}

impl ContainerFormat for ZipContainer {
    fn walk(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()> {
        for i in 0..self.archive.len() {
            let mut entry = self.archive.by_index(i)?;

            if entry.is_dir() || is_zip_symlink(entry.unix_mode()) {
                continue;
            }

            let name = entry.name().to_string();
            visit(&name, &mut entry)?;
        }
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "zip"
    }
}

fn is_zip_symlink(mode: Option<u32>) -> bool {
    mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK)
}
