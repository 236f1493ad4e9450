//! Bounded materialization against the tree-wide size budget.

use std::io;
use std::io::ErrorKind;
use std::io::Read;

use tracing::debug;

use crate::Result;
use crate::security::ExtractionSession;
use crate::security::fault;

/// Reads `reader` into memory, bounded by the session's size budget.
///
/// The source is consumed in increments of `config.read_increment` bytes.
/// Reading stops when:
///
/// - an increment comes back short (end of data), or
/// - the session counter has reached `max_total_size` and a full increment
///   was just read. The partial buffer is returned as a success and the
///   session is marked as having hit the cap.
///
/// Every byte read counts against the session, whichever branch of the
/// recursion reads it. The deadline is checked before each increment, and
/// a panic inside the underlying decoder is converted to
/// [`UnpackError::DecoderFault`](crate::UnpackError::DecoderFault).
///
/// # Errors
///
/// Returns an error if the deadline fires, the source fails, or the decoder
/// panics.
///
/// # Examples
///
/// ```
/// use unnest_core::UnpackConfig;
/// use unnest_core::io::read_to_max;
/// use unnest_core::security::ExtractionSession;
///
/// let config = UnpackConfig::default().with_max_total_size(1024);
/// let session = ExtractionSession::with_default_deadline(config);
///
/// let data = vec![7u8; 4096];
/// let bytes = read_to_max(&session, &mut data.as_slice())?;
/// assert_eq!(bytes.len(), 1024);
/// assert!(session.size_cap_reached());
/// # Ok::<(), unnest_core::UnpackError>(())
/// ```
pub fn read_to_max<R: Read + ?Sized>(session: &ExtractionSession, reader: &mut R) -> Result<Vec<u8>> {
    fault::contain("bounded read", || read_increments(session, reader))
}

fn read_increments<R: Read + ?Sized>(
    session: &ExtractionSession,
    reader: &mut R,
) -> Result<Vec<u8>> {
    let config = session.config();
    let increment = config.read_increment.max(1);
    let mut content = Vec::new();
    let mut chunk = vec![0u8; increment];

    debug!(bytes = session.remaining_budget(), "remaining buffer capacity");

    for _ in 0..=config.max_read_iterations() {
        session.deadline().check()?;

        let read = fill(reader, &mut chunk)?;
        let total = session.record_read(read);
        content.extend_from_slice(&chunk[..read]);

        if read < increment {
            return Ok(content);
        }
        if total >= config.max_total_size {
            session.mark_size_cap_reached();
            debug!(total, "max archive size reached");
            return Ok(content);
        }
    }

    Ok(content)
}

/// Reads until `buf` is full or the source ends; returns the bytes read.
///
/// Decoders may return short reads in the middle of a stream, so a single
/// `read` call is not a reliable end-of-data signal.
pub(crate) fn fill<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
