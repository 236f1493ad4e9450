//! Diagnostics for a finished unpacking call.

use std::time::Duration;

use crate::UnpackError;

/// How an unpacking call ended.
#[derive(Debug)]
pub enum UnpackOutcome {
    /// The whole tree was walked (possibly truncated by the size cap).
    Completed,
    /// The top-level input was not an archive; nothing was emitted.
    NotAnArchive,
    /// The call stopped early; chunks emitted before the failure stand.
    Failed(UnpackError),
}

/// Report of one unpacking call.
///
/// The output stream never carries errors. Consumers that care why a
/// stream ended read this summary from
/// [`ExtractionStream::finish`](crate::ExtractionStream::finish).
#[derive(Debug)]
pub struct UnpackSummary {
    /// How the call ended.
    pub outcome: UnpackOutcome,

    /// Bytes drawn from the tree-wide budget.
    pub bytes_read: u64,

    /// Number of leaf chunks emitted.
    pub leaf_chunks: u64,

    /// Total bytes across all emitted leaf chunks.
    pub leaf_bytes: u64,

    /// Container members visited.
    pub members_visited: u64,

    /// Members whose failure was isolated and skipped.
    pub members_failed: u64,

    /// Deepest depth the opener reached.
    pub max_depth_reached: usize,

    /// Whether any read was truncated by the size cap.
    pub size_cap_reached: bool,

    /// Wall-clock time spent.
    pub duration: Duration,
}

impl UnpackSummary {
    /// Creates a summary for a call that failed before any work started.
    #[must_use]
    pub fn failed(error: UnpackError) -> Self {
        Self {
            outcome: UnpackOutcome::Failed(error),
            bytes_read: 0,
            leaf_chunks: 0,
            leaf_bytes: 0,
            members_visited: 0,
            members_failed: 0,
            max_depth_reached: 0,
            size_cap_reached: false,
            duration: Duration::ZERO,
        }
    }

    /// Returns `true` unless the call ended with a failure.
    ///
    /// A non-archive input counts as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, UnpackOutcome::Failed(_))
    }

    /// Returns the error that ended the call, if any.
    #[must_use]
    pub fn error(&self) -> Option<&UnpackError> {
        match &self.outcome {
            UnpackOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}
