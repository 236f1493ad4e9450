//! Recursive opening of nested archives.
//!
//! The opener identifies a stream, then either decompresses it, walks its
//! members, or treats it as leaf content. Each decompression or container
//! hop adds one to the depth, and every hop draws from the same session
//! budget.

use std::io::Read;

use tracing::debug;
use tracing::warn;

use crate::MemberFailurePolicy;
use crate::Result;
use crate::UnpackError;
use crate::formats::ArchiveType;
use crate::formats::ContainerFormat;
use crate::formats::FormatRole;
use crate::formats::RarContainer;
use crate::formats::SevenZContainer;
use crate::formats::TarContainer;
use crate::formats::ZipContainer;
use crate::formats::identify;
use crate::io::PeekReader;
use crate::io::bounded::fill;
use crate::io::read_to_max;
use crate::security::ExtractionSession;
use crate::security::fault;

use super::sink::LeafSink;

/// Walks one stream recursively, emitting leaf content to a sink.
///
/// # Examples
///
/// ```
/// use unnest_core::UnpackConfig;
/// use unnest_core::extraction::RecursiveOpener;
/// use unnest_core::security::ExtractionSession;
/// use unnest_core::test_utils::gzip_compress;
///
/// let session = ExtractionSession::with_default_deadline(UnpackConfig::default());
/// let mut chunks: Vec<Vec<u8>> = Vec::new();
///
/// let data = gzip_compress(b"AKIA...");
/// RecursiveOpener::new(&session, &mut chunks).open(0, &mut data.as_slice())?;
/// assert_eq!(chunks, vec![b"AKIA...".to_vec()]);
/// # Ok::<(), unnest_core::UnpackError>(())
/// ```
pub struct RecursiveOpener<'a> {
    session: &'a ExtractionSession,
    sink: &'a mut dyn LeafSink,
}

impl<'a> RecursiveOpener<'a> {
    /// Creates an opener bound to one session and one sink.
    pub fn new(session: &'a ExtractionSession, sink: &'a mut dyn LeafSink) -> Self {
        Self { session, sink }
    }

    /// Opens `reader`, which arrived at `depth` hops from the original input.
    ///
    /// At depth 0, content no format matches is reported as
    /// [`UnpackError::NotAnArchive`] and nothing is emitted. Deeper down it
    /// is leaf content and is emitted in chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the depth limit is exceeded, a decoder or walker
    /// fails, the deadline fires, or the sink is closed.
    pub fn open(&mut self, depth: usize, reader: &mut dyn Read) -> Result<()> {
        let max = self.session.config().max_depth;
        if depth >= max {
            return Err(UnpackError::MaxDepthExceeded { depth, max });
        }
        self.session.note_depth(depth);

        let identified = identify(reader)?;
        let mut reader = identified.reader;

        let Some(format) = identified.format else {
            if depth == 0 {
                return Err(UnpackError::NotAnArchive);
            }
            return self.emit_leaf(&mut reader);
        };

        debug!(depth, format = format.name(), "opening archive");

        match format.role() {
            FormatRole::Decompressor(codec) => {
                let content = {
                    let mut decoder = codec.decoder(&mut reader)?;
                    read_to_max(self.session, &mut decoder)?
                };
                self.open(depth + 1, &mut content.as_slice())
            }
            FormatRole::Extractor => self.extract(depth, format, reader),
        }
    }

    fn extract(
        &mut self,
        depth: usize,
        format: ArchiveType,
        mut reader: PeekReader<&mut dyn Read>,
    ) -> Result<()> {
        let mut container: Box<dyn ContainerFormat + '_> = match format {
            ArchiveType::Tar => Box::new(TarContainer::new(reader)),
            ArchiveType::Zip => {
                let data = read_to_max(self.session, &mut reader)?;
                Box::new(ZipContainer::new(data)?)
            }
            ArchiveType::SevenZ => {
                let data = read_to_max(self.session, &mut reader)?;
                Box::new(SevenZContainer::new(data))
            }
            ArchiveType::Rar => {
                let data = read_to_max(self.session, &mut reader)?;
                Box::new(RarContainer::new(&data, self.session.remaining_budget())?)
            }
            // Decompressors never reach here
            other => {
                return Err(UnpackError::UnknownFormatSignal {
                    format: other.name(),
                });
            }
        };

        debug!(depth, format = container.format_name(), "walking members");

        fault::contain("container walk", || {
            container.walk(&mut |name, member| self.visit_member(depth, name, member))
        })
    }

    fn visit_member(&mut self, depth: usize, name: &str, member: &mut dyn Read) -> Result<()> {
        self.session.record_member();
        debug!(depth, member = name, "visiting member");

        let result = read_to_max(self.session, member)
            .and_then(|content| self.open(depth + 1, &mut content.as_slice()));

        match result {
            Err(err)
                if !err.is_interruption()
                    && self.session.config().member_failure_policy
                        == MemberFailurePolicy::IsolateMember =>
            {
                warn!(
                    depth,
                    member = name,
                    code = err.code(),
                    error = %err,
                    "skipping member that failed to unpack"
                );
                self.session.record_member_failure();
                Ok(())
            }
            other => other,
        }
    }

    /// Splits the rest of `reader` into chunks of at most `leaf_chunk_size`.
    fn emit_leaf(&mut self, reader: &mut dyn Read) -> Result<()> {
        let chunk_size = self.session.config().leaf_chunk_size.max(1);

        loop {
            self.session.deadline().check()?;

            let mut chunk = vec![0u8; chunk_size];
            let read = fill(reader, &mut chunk)?;
            if read == 0 {
                return Ok(());
            }
            chunk.truncate(read);

            self.session.record_leaf(read);
            self.sink.emit(chunk)?;

            if read < chunk_size {
                return Ok(());
            }
        }
    }
}
