//! Policy configuration for recursive unpacking.

use std::ffi::OsString;
use std::time::Duration;

use crate::Result;
use crate::UnpackError;

/// What happens when one container member fails to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberFailurePolicy {
    /// Any member failure ends the whole top-level call.
    #[default]
    AbortTree,
    /// A failing member is logged and skipped; siblings still unpack.
    ///
    /// Cancellation and timeouts abort the tree regardless.
    IsolateMember,
}

/// Limits and tunables for one unpacking call.
///
/// Every call receives its own configuration; nothing here is global.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use unnest_core::UnpackConfig;
///
/// // Use the defaults
/// let config = UnpackConfig::default();
/// assert_eq!(config.max_depth, 5);
///
/// // Tighten limits for untrusted uploads
/// let strict = UnpackConfig::default()
///     .with_max_depth(3)
///     .with_max_total_size(16 * 1024 * 1024)
///     .with_max_duration(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct UnpackConfig {
    /// Maximum number of opener invocations along one branch.
    ///
    /// The original input is opened at depth 0 and every hop adds one, so
    /// opening at depth `max_depth` fails. Default: `5`.
    pub max_depth: usize,

    /// Tree-wide budget of bytes read across the whole call.
    ///
    /// Reaching it truncates the data being read; it is not an error.
    ///
    /// Default: 250 MiB.
    pub max_total_size: u64,

    /// Wall-clock budget for the whole call.
    ///
    /// Default: 30 seconds.
    pub max_duration: Duration,

    /// Size of each bounded read increment in bytes.
    ///
    /// Default: `512`.
    pub read_increment: usize,

    /// Maximum size of a leaf chunk sent downstream.
    ///
    /// Default: 10 KiB.
    pub leaf_chunk_size: usize,

    /// Number of chunks the output channel buffers before the producer
    /// blocks.
    ///
    /// Default: `512`.
    pub channel_capacity: usize,

    /// Behavior when a single member fails.
    ///
    /// Default: [`MemberFailurePolicy::AbortTree`].
    pub member_failure_policy: MemberFailurePolicy,

    /// Route ar (deb) and rpm inputs through the external tool path.
    ///
    /// Default: `true`.
    pub specialized_fallback: bool,

    /// Search path for `ar`, `rpm2cpio` and `cpio`.
    ///
    /// `None` uses the process `PATH`.
    ///
    /// Default: `None`.
    pub tool_search_path: Option<OsString>,
}

impl Default for UnpackConfig {
    /// Creates an `UnpackConfig` with the default limits.
    ///
    /// Default values:
    /// - `max_depth`: 5
    /// - `max_total_size`: 250 MiB
    /// - `max_duration`: 30 s
    /// - `read_increment`: 512 bytes
    /// - `leaf_chunk_size`: 10 KiB
    /// - `channel_capacity`: 512
    /// - `member_failure_policy`: `AbortTree`
    /// - `specialized_fallback`: `true`
    /// - `tool_search_path`: `None`
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_total_size: 250 * 1024 * 1024,
            max_duration: Duration::from_secs(30),
            read_increment: 512,
            leaf_chunk_size: 10 * 1024,
            channel_capacity: 512,
            member_failure_policy: MemberFailurePolicy::AbortTree,
            specialized_fallback: true,
            tool_search_path: None,
        }
    }
}

impl UnpackConfig {
    /// Creates a new `UnpackConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the tree-wide byte budget.
    #[must_use]
    pub fn with_max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = size;
        self
    }

    /// Sets the wall-clock budget.
    #[must_use]
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    /// Sets the bounded read increment.
    #[must_use]
    pub fn with_read_increment(mut self, increment: usize) -> Self {
        self.read_increment = increment;
        self
    }

    /// Sets the leaf chunk size.
    #[must_use]
    pub fn with_leaf_chunk_size(mut self, size: usize) -> Self {
        self.leaf_chunk_size = size;
        self
    }

    /// Sets the output channel capacity.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the member failure policy.
    #[must_use]
    pub fn with_member_failure_policy(mut self, policy: MemberFailurePolicy) -> Self {
        self.member_failure_policy = policy;
        self
    }

    /// Enables or disables the external tool path for deb/rpm inputs.
    #[must_use]
    pub fn with_specialized_fallback(mut self, enabled: bool) -> Self {
        self.specialized_fallback = enabled;
        self
    }

    /// Sets the search path used to resolve external tools.
    #[must_use]
    pub fn with_tool_search_path(mut self, path: Option<OsString>) -> Self {
        self.tool_search_path = path;
        self
    }

    /// Number of bounded read increments that fit in the size budget.
    ///
    /// Used only as a loop terminator.
    #[must_use]
    pub fn max_read_iterations(&self) -> u64 {
        self.max_total_size / self.read_increment.max(1) as u64
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an increment, chunk size or channel capacity is
    /// zero.
    pub fn validate(&self) -> Result<()> {
        if self.read_increment == 0 {
            return Err(UnpackError::InvalidConfig {
                field: "read_increment",
            });
        }
        if self.leaf_chunk_size == 0 {
            return Err(UnpackError::InvalidConfig {
                field: "leaf_chunk_size",
            });
        }
        if self.channel_capacity == 0 {
            return Err(UnpackError::InvalidConfig {
                field: "channel_capacity",
            });
        }
        Ok(())
    }
}
