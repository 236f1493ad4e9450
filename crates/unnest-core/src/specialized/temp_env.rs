//! Scratch space for tool-based extraction.

use std::io::Read;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tempfile::TempDir;

use crate::Result;
use crate::io::read_to_max;
use crate::security::ExtractionSession;

/// A materialized input file paired with an extraction directory.
///
/// Both are removed when the environment is dropped, on every exit path.
#[derive(Debug)]
pub struct TempEnv {
    file: NamedTempFile,
    dir: TempDir,
}

impl TempEnv {
    /// Reads `reader` through the bounded reader and writes it to a fresh
    /// temporary file next to an empty extraction directory.
    ///
    /// Nothing is created on disk until the read has succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounded read fails or the temporary resources
    /// cannot be created.
    pub fn materialize(session: &ExtractionSession, reader: &mut dyn Read) -> Result<Self> {
        let content = read_to_max(session, reader)?;

        let mut file = tempfile::Builder::new().prefix("unnest-").tempfile()?;
        file.write_all(&content)?;
        file.flush()?;

        let dir = tempfile::Builder::new()
            .prefix("unnest-extract-")
            .tempdir()?;

        Ok(Self { file, dir })
    }

    /// Path of the materialized input.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        self.file.path()
    }

    /// Directory the external tools extract into.
    #[must_use]
    pub fn extract_path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::UnpackConfig;
    use crate::UnpackError;
    use crate::security::Deadline;

    #[test]
    fn test_materialize_and_cleanup() {
        let session = ExtractionSession::new(UnpackConfig::default(), Deadline::never());
        let env = TempEnv::materialize(&session, &mut &b"!<arch>\n"[..]).unwrap();

        let file = env.file_path().to_path_buf();
        let dir = env.extract_path().to_path_buf();
        assert_eq!(std::fs::read(&file).unwrap(), b"!<arch>\n");
        assert!(dir.is_dir());
        assert_eq!(session.bytes_read(), 8);

        drop(env);
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_failed_read_creates_nothing() {
        let deadline = Deadline::never();
        deadline.cancel();
        let session = ExtractionSession::new(UnpackConfig::default(), deadline);

        let result = TempEnv::materialize(&session, &mut &b"data"[..]);
        assert!(matches!(result, Err(UnpackError::Cancelled)));
    }
}
