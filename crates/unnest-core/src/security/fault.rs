//! Panic containment at the boundary to third-party decoders.
//!
//! Some decoders panic on malformed input instead of returning an error.
//! Every call into decoding code goes through [`contain`], which turns a
//! panic into [`UnpackError::DecoderFault`] so one bad member cannot take
//! down the worker thread.

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;

use tracing::error;

use crate::Result;
use crate::UnpackError;

/// Runs `op`, converting a panic into [`UnpackError::DecoderFault`].
///
/// `boundary` names the call site in the log record.
///
/// # Errors
///
/// Returns whatever `op` returns, or `DecoderFault` if it panicked.
pub fn contain<T>(boundary: &'static str, op: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(boundary, %message, "panic occurred when reading archive");
            Err(UnpackError::DecoderFault { message })
        }
    }
}

/// Renders a panic payload as text.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic occurred with a non-string payload".to_string()
    }
}
