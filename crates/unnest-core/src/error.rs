//! Error types for recursive unpacking operations.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias using `UnpackError`.
pub type Result<T> = std::result::Result<T, UnpackError>;

/// Errors that can occur while unpacking a nested archive.
///
/// Reaching the size cap is intentionally absent: it truncates the
/// materialized data and is reported through
/// [`UnpackSummary::size_cap_reached`](crate::UnpackSummary::size_cap_reached).
#[derive(Error, Debug)]
pub enum UnpackError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The top-level input is not an archive the generic engine recognizes.
    #[error("input is not a recognized archive")]
    NotAnArchive,

    /// Recursion reached the configured depth limit.
    #[error("max archive depth reached: depth {depth}, limit {max}")]
    MaxDepthExceeded {
        /// Depth at which the limit was hit.
        depth: usize,
        /// Configured maximum depth.
        max: usize,
    },

    /// A required external tool is not on the tool search path.
    #[error("required tool {tool} is not installed")]
    ToolMissing {
        /// Name of the missing executable.
        tool: &'static str,
    },

    /// An external tool exited unsuccessfully.
    #[error("unable to execute command `{command}`: {status}; error: {stderr}")]
    ToolExecutionFailed {
        /// Command line that was run.
        command: String,
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Captured standard error text.
        stderr: String,
    },

    /// An external tool placed an entry that resolves outside its
    /// scratch directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry.
        path: PathBuf,
    },

    /// A decoder panicked and the panic was contained.
    #[error("decoder fault: {message}")]
    DecoderFault {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The extraction was cancelled by the caller or the consumer went away.
    #[error("extraction cancelled")]
    Cancelled,

    /// The overall extraction deadline elapsed.
    #[error("extraction timed out")]
    TimedOut,

    /// A format was recognized but no walker exists for it.
    #[error("unknown archive type: {format}")]
    UnknownFormatSignal {
        /// Name of the recognized format.
        format: &'static str,
    },

    /// A decoder or container walker rejected the data.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {field} must be greater than zero")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A package was unpacked but held no payload archive.
    #[error("no payload archive found in {format} package")]
    PayloadNotFound {
        /// Package kind (`deb` or `rpm`).
        format: &'static str,
    },
}

impl UnpackError {
    /// Returns `true` if this error is the benign "not an archive" signal.
    ///
    /// # Examples
    ///
    /// ```
    /// use unnest_core::UnpackError;
    ///
    /// assert!(UnpackError::NotAnArchive.is_benign());
    /// assert!(!UnpackError::Cancelled.is_benign());
    /// ```
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::NotAnArchive)
    }

    /// Returns `true` if the error came from the governing deadline or an
    /// explicit cancellation.
    ///
    /// Interruptions always abort the whole call tree, even when member
    /// failures are isolated.
    #[must_use]
    pub const fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut)
    }

    /// Returns a stable, machine-readable code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use unnest_core::UnpackError;
    ///
    /// let err = UnpackError::ToolMissing { tool: "ar" };
    /// assert_eq!(err.code(), "TOOL_MISSING");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::NotAnArchive => "NOT_AN_ARCHIVE",
            Self::MaxDepthExceeded { .. } => "MAX_DEPTH_EXCEEDED",
            Self::ToolMissing { .. } => "TOOL_MISSING",
            Self::ToolExecutionFailed { .. } => "TOOL_EXECUTION_FAILED",
            Self::PathTraversal { .. } => "PATH_TRAVERSAL",
            Self::DecoderFault { .. } => "DECODER_FAULT",
            Self::Cancelled => "CANCELLED",
            Self::TimedOut => "TIMED_OUT",
            Self::UnknownFormatSignal { .. } => "UNKNOWN_FORMAT",
            Self::InvalidArchive(_) => "INVALID_ARCHIVE",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::PayloadNotFound { .. } => "PAYLOAD_NOT_FOUND",
        }
    }

    /// Returns a context string for this error, if available.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg) => Some(msg),
            Self::DecoderFault { message } => Some(message),
            Self::ToolExecutionFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for UnpackError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::InvalidArchive(format!("zip: {other}")),
        }
    }
}
