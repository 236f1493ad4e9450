//! External tool discovery and invocation for package formats.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;

use tracing::debug;
use walkdir::WalkDir;

use crate::Result;
use crate::UnpackError;
use crate::formats::detect::AR_MIME_TYPE;
use crate::formats::detect::RPM_MIME_TYPE;

/// Package formats that need external tools to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// `ar` archive, which covers Debian packages.
    Deb,
    /// RPM package.
    Rpm,
}

impl PackageKind {
    /// Maps a MIME label from [`classify`](crate::formats::detect::classify)
    /// to a package kind.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            AR_MIME_TYPE => Some(Self::Deb),
            RPM_MIME_TYPE => Some(Self::Rpm),
            _ => None,
        }
    }

    /// Returns a short name for logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }

    /// Returns `true` if an unpacked member named `name` is the payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use unnest_core::specialized::PackageKind;
    ///
    /// assert!(PackageKind::Deb.is_payload("data.tar.xz"));
    /// assert!(!PackageKind::Deb.is_payload("control.tar.gz"));
    /// assert!(PackageKind::Rpm.is_payload("hello-2.12.tar.gz"));
    /// ```
    #[must_use]
    pub fn is_payload(self, name: &str) -> bool {
        match self {
            Self::Deb => name.starts_with("data.tar."),
            Self::Rpm => name.ends_with(".tar.gz"),
        }
    }
}

/// Resolved executables for one package kind.
#[derive(Debug, Clone)]
pub enum PackageTools {
    /// `ar x <package>`.
    Ar {
        /// Path to `ar`.
        ar: PathBuf,
    },
    /// `rpm2cpio <package> | cpio -id --no-absolute-filenames`.
    Rpm {
        /// Path to `rpm2cpio`.
        rpm2cpio: PathBuf,
        /// Path to `cpio`.
        cpio: PathBuf,
    },
}

impl PackageTools {
    /// Unpacks `package` into `workdir`.
    ///
    /// Standard error is captured in full. No shell is involved. Afterwards
    /// every link under `workdir` must resolve inside it.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::ToolExecutionFailed`] on a non-zero exit,
    /// [`UnpackError::PathTraversal`] if the package reached outside
    /// `workdir`, or an I/O error if a process cannot be started.
    pub fn unpack(&self, package: &Path, workdir: &Path) -> Result<()> {
        match self {
            Self::Ar { ar } => run_ar(ar, package, workdir)?,
            Self::Rpm { rpm2cpio, cpio } => run_rpm(rpm2cpio, cpio, package, workdir)?,
        }
        ensure_confined(workdir)
    }
}

/// Finds external tools on a configurable search path.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    search_path: Option<OsString>,
}

impl ToolLocator {
    /// Creates a locator; `None` searches the process `PATH`.
    #[must_use]
    pub fn new(search_path: Option<OsString>) -> Self {
        Self { search_path }
    }

    /// Resolves `tool` to an executable path.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::ToolMissing`] if the tool cannot be found.
    pub fn locate(&self, tool: &'static str) -> Result<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => which::which_in(tool, Some(paths), Path::new(".")),
            None => which::which(tool),
        };
        found.map_err(|_| UnpackError::ToolMissing { tool })
    }

    /// Resolves every tool `kind` needs, failing on the first missing one.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::ToolMissing`] naming the first missing tool.
    pub fn ensure_tools(&self, kind: PackageKind) -> Result<PackageTools> {
        match kind {
            PackageKind::Deb => Ok(PackageTools::Ar {
                ar: self.locate("ar")?,
            }),
            PackageKind::Rpm => Ok(PackageTools::Rpm {
                rpm2cpio: self.locate("rpm2cpio")?,
                cpio: self.locate("cpio")?,
            }),
        }
    }
}

fn run_ar(ar: &Path, package: &Path, workdir: &Path) -> Result<()> {
    let command = format!("ar x {}", package.display());
    debug!(%command, "running external tool");

    let output = Command::new(ar)
        .arg("x")
        .arg(package)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;

    check_status(command, output.status, &output.stderr)
}

fn run_rpm(rpm2cpio: &Path, cpio: &Path, package: &Path, workdir: &Path) -> Result<()> {
    let command = format!(
        "rpm2cpio {} | cpio -id --no-absolute-filenames",
        package.display()
    );
    debug!(%command, "running external tool");

    // A file rather than a pipe, so neither child blocks on a full stderr
    let mut converter_stderr = tempfile::tempfile()?;

    let mut converter = Command::new(rpm2cpio)
        .arg(package)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(converter_stderr.try_clone()?)
        .spawn()?;

    let Some(archive) = converter.stdout.take() else {
        converter.kill()?;
        converter.wait()?;
        return Err(UnpackError::Io(io::Error::other(
            "rpm2cpio stdout was not captured",
        )));
    };

    let extracted = Command::new(cpio)
        .arg("-id")
        .arg("--no-absolute-filenames")
        .current_dir(workdir)
        .stdin(archive)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();
    let converter_status = converter.wait()?;
    let extracted = extracted?;

    if !converter_status.success() {
        let mut stderr = Vec::new();
        converter_stderr.rewind()?;
        converter_stderr.read_to_end(&mut stderr)?;
        return check_status(command, converter_status, &stderr);
    }

    check_status(command, extracted.status, &extracted.stderr)
}

/// Fails if a link unpacked under `root` points outside it.
///
/// Everything else the walk reaches is inside `root`, because links are
/// not followed. A link that does not resolve is judged by its target
/// text alone.
fn ensure_confined(root: &Path) -> Result<()> {
    let root = root.canonicalize()?;

    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = entry.map_err(|e| io::Error::other(format!("walkdir error: {e}")))?;
        if !entry.path_is_symlink() {
            continue;
        }

        let inside = match entry.path().canonicalize() {
            Ok(resolved) => resolved.starts_with(&root),
            Err(_) => {
                let target = fs::read_link(entry.path())?;
                !target.is_absolute()
                    && !target.components().any(|c| c == Component::ParentDir)
            }
        };
        if !inside {
            return Err(UnpackError::PathTraversal {
                path: entry.path().to_path_buf(),
            });
        }
    }
    Ok(())
}

fn check_status(command: String, status: ExitStatus, stderr: &[u8]) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(UnpackError::ToolExecutionFailed {
        command,
        status,
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    })
}
