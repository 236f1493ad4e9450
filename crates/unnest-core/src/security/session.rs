//! Per-call extraction session: the tree-wide byte budget and diagnostics.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::UnpackConfig;
use crate::report::UnpackOutcome;
use crate::report::UnpackSummary;

use super::deadline::Deadline;

/// State shared by every branch of one top-level unpacking call.
///
/// One session is created per call and handed by shared reference to every
/// recursive hop and every bounded read. The byte counter is tree-wide:
/// many small branches draw from the same budget, so fan-out cannot
/// amplify the total amount read.
///
/// Counters are atomics, which keeps the session `Sync`. Siblings are
/// processed sequentially, so relaxed ordering is sufficient.
#[derive(Debug)]
pub struct ExtractionSession {
    config: UnpackConfig,
    deadline: Deadline,
    bytes_read: AtomicU64,
    leaf_chunks: AtomicU64,
    leaf_bytes: AtomicU64,
    members_visited: AtomicU64,
    members_failed: AtomicU64,
    max_depth_reached: AtomicUsize,
    size_cap_reached: AtomicBool,
}

impl ExtractionSession {
    /// Creates a fresh session governed by `deadline`.
    #[must_use]
    pub fn new(config: UnpackConfig, deadline: Deadline) -> Self {
        Self {
            config,
            deadline,
            bytes_read: AtomicU64::new(0),
            leaf_chunks: AtomicU64::new(0),
            leaf_bytes: AtomicU64::new(0),
            members_visited: AtomicU64::new(0),
            members_failed: AtomicU64::new(0),
            max_depth_reached: AtomicUsize::new(0),
            size_cap_reached: AtomicBool::new(false),
        }
    }

    /// Creates a session whose deadline is `config.max_duration` from now.
    #[must_use]
    pub fn with_default_deadline(config: UnpackConfig) -> Self {
        let deadline = Deadline::after(config.max_duration);
        Self::new(config, deadline)
    }

    /// Returns the policy for this call.
    #[must_use]
    pub fn config(&self) -> &UnpackConfig {
        &self.config
    }

    /// Returns the deadline governing this call.
    #[must_use]
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Adds `bytes` to the tree-wide counter and returns the new total.
    pub fn record_read(&self, bytes: usize) -> u64 {
        let bytes = bytes as u64;
        self.bytes_read
            .fetch_add(bytes, Ordering::Relaxed)
            .saturating_add(bytes)
    }

    /// Total bytes read so far across the whole tree.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Bytes left before the size cap is reached.
    #[must_use]
    pub fn remaining_budget(&self) -> u64 {
        self.config.max_total_size.saturating_sub(self.bytes_read())
    }

    /// Records that a bounded read stopped at the size cap.
    pub fn mark_size_cap_reached(&self) {
        self.size_cap_reached.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once any bounded read stopped at the size cap.
    #[must_use]
    pub fn size_cap_reached(&self) -> bool {
        self.size_cap_reached.load(Ordering::Relaxed)
    }

    /// Records one leaf chunk of `len` bytes sent downstream.
    pub fn record_leaf(&self, len: usize) {
        self.leaf_chunks.fetch_add(1, Ordering::Relaxed);
        self.leaf_bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Records a container member being visited.
    pub fn record_member(&self) {
        self.members_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a member whose failure was isolated.
    pub fn record_member_failure(&self) {
        self.members_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records that the opener arrived at `depth`.
    pub fn note_depth(&self, depth: usize) {
        self.max_depth_reached.fetch_max(depth, Ordering::Relaxed);
    }

    /// Builds the diagnostics summary for this session.
    #[must_use]
    pub fn summary(&self, outcome: UnpackOutcome, elapsed: Duration) -> UnpackSummary {
        UnpackSummary {
            outcome,
            bytes_read: self.bytes_read(),
            leaf_chunks: self.leaf_chunks.load(Ordering::Relaxed),
            leaf_bytes: self.leaf_bytes.load(Ordering::Relaxed),
            members_visited: self.members_visited.load(Ordering::Relaxed),
            members_failed: self.members_failed.load(Ordering::Relaxed),
            max_depth_reached: self.max_depth_reached.load(Ordering::Relaxed),
            size_cap_reached: self.size_cap_reached(),
            duration: elapsed,
        }
    }
}
