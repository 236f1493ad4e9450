//! 7z archive format handler.
//!
//! Members are visited through the sevenz-rust2 callback API, which decodes
//! each folder once and hands every entry's stream to the callback in
//! archive order. Nothing is written to disk.
//!
//! # Limitations
//!
//! - Encrypted archives are rejected: no password is ever supplied.
//! - A member the visitor leaves partially read (the size cap truncated it)
//!   ends the walk, because the decoder cannot resume mid-block.

use std::cell::RefCell;
use std::io::Cursor;
use std::io::Read;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::Result;
use crate::UnpackError;

use super::traits::ContainerFormat;
use super::traits::MemberVisitor;

/// 7z archive walker over materialized bytes.
///
/// The 7z header sits at the end of the file, so the caller materializes
/// the archive through the bounded reader first.
pub struct SevenZContainer {
    source: Cursor<Vec<u8>>,
}

impl SevenZContainer {
    /// Wraps materialized 7z bytes.
    ///
    /// The header is parsed lazily by [`ContainerFormat::walk`].
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            source: Cursor::new(data),
        }
    }
}

impl ContainerFormat for SevenZContainer {
    fn walk(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()> {
        // sevenz-rust2 insists on a destination directory even when the
        // callback writes nothing to it
        let scratch = TempDir::new()?;

        let visitor = RefCell::new(visit);
        let failure: RefCell<Option<UnpackError>> = RefCell::new(None);

        let extract_fn = |entry: &sevenz_rust2::ArchiveEntry,
                          reader: &mut dyn Read,
                          _dest: &PathBuf|
         -> std::result::Result<bool, sevenz_rust2::Error> {
            if entry.is_directory() {
                return Ok(true);
            }

            let mut visit = visitor.borrow_mut();
            if let Err(e) = (*visit)(&entry.name, reader) {
                *failure.borrow_mut() = Some(e);
                return Ok(false);
            }

            // Check for leftover data; stop rather than desynchronize the block
            let mut byte = [0u8; 1];
            Ok(matches!(reader.read(&mut byte), Ok(0)))
        };

        let walked =
            sevenz_rust2::decompress_with_extract_fn(&mut self.source, scratch.path(), extract_fn);

        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        walked.map_err(UnpackError::from)
    }

    fn format_name(&self) -> &'static str {
        "7z"
    }
}

/// Converts sevenz-rust2 errors to our `UnpackError` type.
impl From<sevenz_rust2::Error> for UnpackError {
    fn from(err: sevenz_rust2::Error) -> Self {
        let err_str = err.to_string();
        let err_lower = err_str.to_lowercase();

        if err_lower.contains("password") || err_lower.contains("encrypt") {
            return Self::InvalidArchive(format!("encrypted 7z archive: {err_str}"));
        }

        Self::InvalidArchive(format!("7z error: {err_str}"))
    }
}
