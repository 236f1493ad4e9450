//! I/O utilities for archive operations.
//!
//! This module provides the bounded reader used to materialize data against
//! the session budget, and a peeking reader used for format detection on
//! non-seekable sources.

pub mod bounded;
pub mod peek;

// Re-export main types for convenience
pub use bounded::read_to_max;
pub use peek::PeekReader;
