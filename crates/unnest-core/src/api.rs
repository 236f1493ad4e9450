//! High-level public API for recursive unpacking.

use std::io;
use std::io::Read;

use tracing::debug;

use crate::UnpackConfig;
use crate::extraction::ExtractionStream;
use crate::extraction::RecursiveOpener;
use crate::formats::identify;
use crate::io::PeekReader;
use crate::specialized::Specialized;
use crate::specialized::SpecializedExtractor;

/// Unpacks `reader` recursively on a background worker.
///
/// Leaf content is delivered in walk order through the returned stream.
/// The stream closes when the worker is done; call
/// [`ExtractionStream::finish`] for the outcome and diagnostics.
///
/// Input that is not an archive at all yields no chunks and a
/// [`NotAnArchive`](crate::UnpackOutcome::NotAnArchive) outcome.
///
/// # Examples
///
/// ```
/// use unnest_core::UnpackConfig;
/// use unnest_core::test_utils::create_test_tar;
/// use unnest_core::test_utils::gzip_compress;
/// use unnest_core::unpack_stream;
///
/// let tar = create_test_tar(vec![("a.env", b"KEY=1"), ("b.env", b"KEY=2")]);
/// let input = std::io::Cursor::new(gzip_compress(&tar));
///
/// let mut stream = unpack_stream(input, UnpackConfig::default());
/// let chunks: Vec<Vec<u8>> = stream.by_ref().collect();
/// assert_eq!(chunks, vec![b"KEY=1".to_vec(), b"KEY=2".to_vec()]);
/// assert!(stream.finish().is_success());
/// ```
#[must_use]
pub fn unpack_stream<R>(mut reader: R, config: UnpackConfig) -> ExtractionStream
where
    R: Read + Send + 'static,
{
    ExtractionStream::spawn(config, move |session, sink| {
        RecursiveOpener::new(session, sink).open(0, &mut reader)
    })
}

/// Like [`unpack_stream`], but Debian and RPM packages are unpacked with
/// the system tools first.
///
/// The package's payload enters the engine at depth 1 and shares the
/// call's size budget and deadline. With
/// [`specialized_fallback`](UnpackConfig::specialized_fallback) disabled
/// this is exactly [`unpack_stream`].
///
/// # Examples
///
/// ```
/// use unnest_core::UnpackConfig;
/// use unnest_core::test_utils::gzip_compress;
/// use unnest_core::unpack_stream_with_fallback;
///
/// let input = std::io::Cursor::new(gzip_compress(b"not a package"));
/// let mut stream = unpack_stream_with_fallback(input, UnpackConfig::default());
///
/// let content: Vec<u8> = stream.by_ref().flatten().collect();
/// assert_eq!(content, b"not a package");
/// ```
#[must_use]
pub fn unpack_stream_with_fallback<R>(reader: R, config: UnpackConfig) -> ExtractionStream
where
    R: Read + Send + 'static,
{
    if !config.specialized_fallback {
        return unpack_stream(reader, config);
    }

    ExtractionStream::spawn(config, move |session, sink| {
        let extractor = SpecializedExtractor::new(session.config());
        match extractor.handle(session, 0, reader)? {
            Specialized::Extracted(mut payload) => {
                debug!(
                    format = payload.kind().name(),
                    payload = payload.name(),
                    "unpacking package payload"
                );
                RecursiveOpener::new(session, sink).open(1, &mut payload)
            }
            Specialized::Passthrough(mut reader) => {
                RecursiveOpener::new(session, sink).open(0, &mut reader)
            }
        }
    })
}

/// Returns `true` if the generic engine can unpack `reader`.
///
/// Only the first bytes are inspected. The returned reader still yields the
/// complete stream, so the caller can hand it to [`unpack_stream`].
///
/// # Errors
///
/// Returns an error if reading the header fails.
///
/// # Examples
///
/// ```
/// use unnest_core::is_archive;
/// use unnest_core::test_utils::gzip_compress;
///
/// let (_, yes) = is_archive(gzip_compress(b"x").as_slice())?;
/// let (_, no) = is_archive(&b"plain text"[..])?;
/// assert!(yes);
/// assert!(!no);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn is_archive<R: Read>(reader: R) -> io::Result<(PeekReader<R>, bool)> {
    let identified = identify(reader)?;
    Ok((identified.reader, identified.format.is_some()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::UnpackError;
    use crate::UnpackOutcome;
    use crate::test_utils::create_test_ar;
    use crate::test_utils::create_test_rar;
    use crate::test_utils::create_test_zip;
    use crate::test_utils::nested_gzip;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_unpack_stream_nested() {
        let zip = create_test_zip(vec![("inner.gz", nested_gzip(b"deep", 2).as_slice())]);
        let mut stream = unpack_stream(Cursor::new(zip), UnpackConfig::default());

        assert_eq!(stream.by_ref().collect::<Vec<_>>(), vec![b"deep".to_vec()]);
        let summary = stream.finish();
        assert!(summary.is_success());
        assert_eq!(summary.max_depth_reached, 3);
    }

    #[test]
    fn test_unpack_stream_plain_input() {
        let mut stream = unpack_stream(Cursor::new(b"just text".to_vec()), UnpackConfig::default());
        assert_eq!(stream.next(), None);
        assert!(matches!(
            stream.finish().outcome,
            UnpackOutcome::NotAnArchive
        ));
    }

    #[test]
    fn test_fallback_disabled_ignores_packages() {
        let deb = create_test_ar(vec![("data.tar.gz", b"x".as_slice())]);
        let config = UnpackConfig::default().with_specialized_fallback(false);

        let mut stream = unpack_stream_with_fallback(Cursor::new(deb), config);
        assert_eq!(stream.next(), None);
        assert!(matches!(
            stream.finish().outcome,
            UnpackOutcome::NotAnArchive
        ));
    }

    #[test]
    fn test_fallback_missing_tool_reported() {
        let empty = TempDir::new().unwrap();
        let config = UnpackConfig::default()
            .with_tool_search_path(Some(empty.path().as_os_str().to_owned()));
        let deb = create_test_ar(vec![("data.tar.gz", b"x".as_slice())]);

        let mut stream = unpack_stream_with_fallback(Cursor::new(deb), config);
        assert_eq!(stream.next(), None);
        assert!(matches!(
            stream.finish().error(),
            Some(UnpackError::ToolMissing { tool: "ar" })
        ));
    }

    #[test]
    fn test_fallback_passthrough_uses_engine() {
        let zip = create_test_zip(vec![("a.txt", b"alpha")]);
        let mut stream = unpack_stream_with_fallback(Cursor::new(zip), UnpackConfig::default());
        assert_eq!(stream.by_ref().collect::<Vec<_>>(), vec![b"alpha".to_vec()]);
        assert!(stream.finish().is_success());
    }

    #[test]
    fn test_is_archive_keeps_bytes() {
        let data = nested_gzip(b"payload", 1);
        let (mut reader, walkable) = is_archive(data.as_slice()).unwrap();
        assert!(walkable);

        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, data);
    }

    #[test]
    fn test_is_archive_accepts_rar() {
        let rar = create_test_rar(vec![("a.txt", b"alpha")]);
        let (_, walkable) = is_archive(rar.as_slice()).unwrap();
        assert!(walkable);
    }

    #[test]
    fn test_unpack_stream_rar() {
        let rar = create_test_rar(vec![("creds.env", b"TOKEN=abc")]);
        let mut stream = unpack_stream(Cursor::new(rar), UnpackConfig::default());
        assert_eq!(stream.by_ref().collect::<Vec<_>>(), vec![b"TOKEN=abc".to_vec()]);
        assert!(stream.finish().is_success());
    }
}
