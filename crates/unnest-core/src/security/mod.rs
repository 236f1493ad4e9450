//! Resource limits and fault containment shared by one unpacking call.
//!
//! Every recursive hop and every bounded read works against a single
//! [`ExtractionSession`]: one byte budget, one deadline, one set of
//! diagnostics counters.

pub mod deadline;
pub mod fault;
pub mod session;

// Re-export public types and functions
pub use deadline::CancelHandle;
pub use deadline::Deadline;
pub use fault::contain;
pub use session::ExtractionSession;
