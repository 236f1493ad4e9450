//! Package formats unpacked by external tools.
//!
//! Debian (`ar`) and RPM packages are not walked by the generic engine.
//! [`SpecializedExtractor`] resolves the required tools up front, unpacks
//! the package inside a [`TempEnv`] and hands back the payload archive so
//! the engine can continue with it.

pub mod extractor;
pub mod temp_env;
pub mod tools;

// Re-export main types for convenience
pub use extractor::Payload;
pub use extractor::Specialized;
pub use extractor::SpecializedExtractor;
pub use temp_env::TempEnv;
pub use tools::PackageKind;
pub use tools::PackageTools;
pub use tools::ToolLocator;
