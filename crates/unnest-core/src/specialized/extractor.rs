//! Package extraction through external tools.
//!
//! `ar` (Debian) and RPM packages are unpacked by the system tools into a
//! [`TempEnv`]. The payload member is then copied out into a standalone
//! temporary file, so the returned reader stays valid after the scratch
//! directory is gone.

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::Result;
use crate::UnpackConfig;
use crate::UnpackError;
use crate::formats::detect::HEADER_LEN;
use crate::formats::detect::classify;
use crate::io::PeekReader;
use crate::security::ExtractionSession;

use super::temp_env::TempEnv;
use super::tools::PackageKind;
use super::tools::PackageTools;
use super::tools::ToolLocator;

/// Outcome of offering a stream to the specialized extractor.
#[derive(Debug)]
pub enum Specialized<R> {
    /// The stream was a package; this is its payload.
    Extracted(Payload),
    /// The stream was not a package. The reader still yields every byte.
    Passthrough(PeekReader<R>),
}

/// The payload archive found inside a package.
///
/// Backed by its own temporary file, removed when the payload is dropped.
#[derive(Debug)]
pub struct Payload {
    name: String,
    kind: PackageKind,
    file: NamedTempFile,
}

impl Payload {
    /// Member name of the payload inside the package.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of package the payload came from.
    #[must_use]
    pub fn kind(&self) -> PackageKind {
        self.kind
    }
}

impl Read for Payload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Unpacks deb and rpm packages with `ar`, `rpm2cpio` and `cpio`.
///
/// # Examples
///
/// ```
/// use unnest_core::UnpackConfig;
/// use unnest_core::security::ExtractionSession;
/// use unnest_core::specialized::Specialized;
/// use unnest_core::specialized::SpecializedExtractor;
///
/// let config = UnpackConfig::default();
/// let session = ExtractionSession::with_default_deadline(config.clone());
/// let extractor = SpecializedExtractor::new(&config);
///
/// // Not a package: handed back untouched
/// let result = extractor.handle(&session, 0, &b"plain text"[..])?;
/// assert!(matches!(result, Specialized::Passthrough(_)));
/// # Ok::<(), unnest_core::UnpackError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SpecializedExtractor {
    tools: ToolLocator,
}

impl SpecializedExtractor {
    /// Creates an extractor resolving tools on `config.tool_search_path`.
    #[must_use]
    pub fn new(config: &UnpackConfig) -> Self {
        Self {
            tools: ToolLocator::new(config.tool_search_path.clone()),
        }
    }

    /// Classifies `reader` and, if it is a package, extracts its payload.
    ///
    /// Tools are resolved before any temporary resource is created or any
    /// process is started.
    ///
    /// # Errors
    ///
    /// Returns an error if a required tool is missing, the depth limit is
    /// exceeded, a tool fails, or the package holds no payload.
    pub fn handle<R: Read>(
        &self,
        session: &ExtractionSession,
        depth: usize,
        reader: R,
    ) -> Result<Specialized<R>> {
        let reader = PeekReader::new(reader, HEADER_LEN)?;
        let Some(kind) = PackageKind::from_mime(classify(reader.header())) else {
            return Ok(Specialized::Passthrough(reader));
        };

        let tools = self.tools.ensure_tools(kind)?;
        self.extract_package(session, depth, kind, &tools, reader)
            .map(Specialized::Extracted)
    }

    fn extract_package(
        &self,
        session: &ExtractionSession,
        depth: usize,
        kind: PackageKind,
        tools: &PackageTools,
        mut reader: impl Read,
    ) -> Result<Payload> {
        let max = session.config().max_depth;
        if depth >= max {
            return Err(UnpackError::MaxDepthExceeded { depth, max });
        }
        session.note_depth(depth);

        let env = TempEnv::materialize(session, &mut reader)?;
        debug!(depth, format = kind.name(), "extracting package");
        tools.unpack(env.file_path(), env.extract_path())?;

        let member = self.locate_payload(session, depth, kind, &env)?;
        let file = copy_out(&env.extract_path().join(&member))?;
        let name = member.to_string_lossy().into_owned();
        debug!(depth, format = kind.name(), payload = %name, "located package payload");

        Ok(Payload { name, kind, file })
    }

    /// Picks the payload among the unpacked members, in name order.
    fn locate_payload(
        &self,
        session: &ExtractionSession,
        depth: usize,
        kind: PackageKind,
        env: &TempEnv,
    ) -> Result<OsString> {
        let mut members = Vec::new();
        for entry in fs::read_dir(env.extract_path())? {
            let entry = entry?;
            // Directories and symlinks are never payloads
            if entry.file_type()?.is_file() {
                members.push(entry.file_name());
            }
        }
        members.sort();

        for member in members {
            if kind.is_payload(&member.to_string_lossy()) {
                return Ok(member);
            }
            if self.validate_nested(session, depth, &env.extract_path().join(&member))? {
                return Ok(member);
            }
        }

        Err(UnpackError::PayloadNotFound {
            format: kind.name(),
        })
    }

    /// Returns `true` if `path` is itself a package that unpacks cleanly.
    fn validate_nested(&self, session: &ExtractionSession, depth: usize, path: &Path) -> Result<bool> {
        let file = File::open(path)?;
        match self.handle(session, depth + 1, file)? {
            Specialized::Extracted(_) => Ok(true),
            Specialized::Passthrough(_) => Ok(false),
        }
    }
}

/// Copies `path` into a standalone temporary file, rewound for reading.
fn copy_out(path: &Path) -> Result<NamedTempFile> {
    let mut source = File::open(path)?;
    let mut copy = tempfile::Builder::new().prefix("unnest-payload-").tempfile()?;
    io::copy(&mut source, &mut copy)?;
    copy.rewind()?;
    Ok(copy)
}
