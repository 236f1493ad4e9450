//! Recursive extraction and delivery of leaf content.

pub mod opener;
pub mod sink;
pub mod stream;

// Re-export main types for convenience
pub use opener::RecursiveOpener;
pub use sink::ChannelSink;
pub use sink::LeafSink;
pub use stream::ExtractionStream;
