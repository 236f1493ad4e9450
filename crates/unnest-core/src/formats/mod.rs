//! Archive format implementations.
//!
//! Detection works on magic numbers only. Compression codecs are 1:1
//! stream transforms; containers are walked member by member through
//! [`ContainerFormat`].

pub mod compression;
pub mod detect;
pub mod rar;
pub mod sevenz;
pub mod tar;
pub mod traits;
pub mod zip;

// Re-export main types for convenience
pub use compression::CompressionCodec;
pub use detect::ArchiveType;
pub use detect::FormatRole;
pub use detect::identify;
pub use rar::RarContainer;
pub use sevenz::SevenZContainer;
pub use tar::TarContainer;
pub use traits::ContainerFormat;
pub use zip::ZipContainer;
