//! Cooperative deadline shared by every read in one unpacking call.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::Result;
use crate::UnpackError;

/// Wall-clock limit plus an explicit cancellation flag.
///
/// Clones share the cancellation flag, so cancelling any clone (or a
/// [`CancelHandle`]) stops every reader that checks this deadline.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Creates a deadline that fires `timeout` from now.
    ///
    /// A timeout too large to represent never expires.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a deadline that only fires on explicit cancellation.
    #[must_use]
    pub fn never() -> Self {
        Self {
            expires_at: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a handle that can cancel this deadline from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Fires the deadline immediately.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns the time left before expiry, if the deadline has one.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Returns `true` once the deadline was cancelled or has expired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Checks the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::Cancelled`] after an explicit cancellation and
    /// [`UnpackError::TimedOut`] once the wall-clock limit has passed.
    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(UnpackError::Cancelled);
        }
        if let Some(at) = self.expires_at
            && Instant::now() >= at
        {
            return Err(UnpackError::TimedOut);
        }
        Ok(())
    }
}

/// Cancels a running extraction.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation. Readers stop before their next increment.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_passes() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(deadline.check().is_ok());
        assert!(!deadline.is_done());
        assert!(deadline.remaining().is_some());
    }

    #[test]
    fn test_zero_timeout_expires() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(matches!(deadline.check(), Err(UnpackError::TimedOut)));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_cancel_takes_precedence() {
        let deadline = Deadline::after(Duration::ZERO);
        deadline.cancel();
        assert!(matches!(deadline.check(), Err(UnpackError::Cancelled)));
    }

    #[test]
    fn test_cancel_handle_shared_across_clones() {
        let deadline = Deadline::never();
        let clone = deadline.clone();
        let handle = deadline.cancel_handle();

        assert!(!handle.is_cancelled());
        handle.cancel();

        assert!(handle.is_cancelled());
        assert!(matches!(deadline.check(), Err(UnpackError::Cancelled)));
        assert!(matches!(clone.check(), Err(UnpackError::Cancelled)));
    }

    #[test]
    fn test_never_has_no_remaining() {
        let deadline = Deadline::never();
        assert_eq!(deadline.remaining(), None);
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let deadline = Deadline::after(Duration::MAX);
        assert!(deadline.check().is_ok());
    }
}
