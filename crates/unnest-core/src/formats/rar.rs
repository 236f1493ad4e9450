//! RAR archive format handler.
//!
//! Members are decoded by the `unrar` library, which only opens archives by
//! path. The materialized bytes are written to a temporary file first and
//! nothing else touches the disk.
//!
//! # Limitations
//!
//! - Each member is decoded in full before the visitor sees it. Members
//!   declaring more bytes than the budget left when the archive was opened
//!   are skipped instead.
//! - Encrypted members are skipped: no password is ever supplied.
//! - Multi-volume archives are walked only as far as the first volume.

use std::io::Cursor;
use std::io::Write;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::Result;
use crate::UnpackError;

use super::traits::ContainerFormat;
use super::traits::MemberVisitor;

/// RAR archive walker over materialized bytes.
pub struct RarContainer {
    file: NamedTempFile,
    member_limit: u64,
}

impl RarContainer {
    /// Writes `data` to a temporary file for the decoder.
    ///
    /// Members larger than `member_limit` bytes are not decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written.
    pub fn new(data: &[u8], member_limit: u64) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("unnest-rar-")
            .suffix(".rar")
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self { file, member_limit })
    }
}

impl ContainerFormat for RarContainer {
    fn walk(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()> {
        let mut archive = unrar::Archive::new(self.file.path()).open_for_processing()?;

        while let Some(header) = archive.read_header()? {
            let entry = header.entry();
            let name = entry.filename.to_string_lossy().into_owned();

            if !entry.is_file() || entry.is_encrypted() || entry.is_split_before() {
                archive = header.skip()?;
                continue;
            }
            if entry.unpacked_size > self.member_limit {
                debug!(
                    member = %name,
                    size = entry.unpacked_size,
                    limit = self.member_limit,
                    "skipping rar member larger than the remaining budget"
                );
                archive = header.skip()?;
                continue;
            }

            let (data, rest) = header.read()?;
            visit(&name, &mut Cursor::new(data))?;
            archive = rest;
        }
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "rar"
    }
}

impl From<unrar::error::UnrarError> for UnpackError {
    fn from(err: unrar::error::UnrarError) -> Self {
        Self::InvalidArchive(format!("rar: {err}"))
    }
}
