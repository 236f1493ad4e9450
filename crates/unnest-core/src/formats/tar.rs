//! Tar archive format handler.

use std::io::Read;

use crate::Result;
use crate::UnpackError;

use super::traits::ContainerFormat;
use super::traits::MemberVisitor;

/// Tar archive walker.
///
/// Tar is read strictly sequentially, so it streams straight from the
/// source without being materialized first.
pub struct TarContainer<R: Read> {
    archive: ::tar::Archive<R>,
}

impl<R: Read> TarContainer<R> {
    /// Creates a walker over a tar stream.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            archive: ::tar::Archive::new(reader),
        }
    }
}

impl<R: Read> ContainerFormat for TarContainer<R> {
    fn walk(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()> {
        let entries = self.archive.entries().map_err(|e| {
            UnpackError::InvalidArchive(format!("failed to read TAR entries: {e}"))
        })?;

        for entry_result in entries {
            let mut entry = entry_result.map_err(|e| {
                UnpackError::InvalidArchive(format!("failed to read TAR entry: {e}"))
            })?;

            // Directories, links and device nodes carry no content
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = entry.path().map_or_else(
                |_| String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
                |p| p.to_string_lossy().into_owned(),
            );
            visit(&name, &mut entry)?;
        }

        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "tar"
    }
}
