//! Bounded recursive archive unpacking.
//!
//! `unnest-core` turns an arbitrarily nested, possibly hostile blob into an
//! ordered stream of leaf content for downstream inspection. Gzip, bzip2,
//! xz and zstd layers are decompressed; tar, zip and 7z containers are
//! walked member by member; Debian and RPM packages are unpacked with the
//! system tools. Every call is bounded by a nesting depth, a tree-wide byte
//! budget and a deadline, and decoder panics are contained.
//!
//! # Examples
//!
//! ```
//! use unnest_core::UnpackConfig;
//! use unnest_core::test_utils::create_test_zip;
//! use unnest_core::test_utils::gzip_compress;
//! use unnest_core::unpack_stream;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let zip = create_test_zip(vec![("config.yml", b"token: abc123")]);
//! let input = std::io::Cursor::new(gzip_compress(&zip));
//!
//! let mut stream = unpack_stream(input, UnpackConfig::default());
//! for chunk in stream.by_ref() {
//!     println!("{} bytes of leaf content", chunk.len());
//! }
//!
//! let summary = stream.finish();
//! println!("read {} bytes", summary.bytes_read);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod io;
pub mod report;
pub mod security;
pub mod specialized;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main API types
pub use api::is_archive;
pub use api::unpack_stream;
pub use api::unpack_stream_with_fallback;
pub use config::MemberFailurePolicy;
pub use config::UnpackConfig;
pub use error::Result;
pub use error::UnpackError;
pub use extraction::ExtractionStream;
pub use report::UnpackOutcome;
pub use report::UnpackSummary;
