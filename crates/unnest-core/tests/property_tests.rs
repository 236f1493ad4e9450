//! Property-based tests for leaf emission and the size budget.
//!
//! These tests use proptest to generate arbitrary inputs and verify the
//! streaming guarantees hold across a wide range of cases.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;

use proptest::prelude::*;
use unnest_core::UnpackConfig;
use unnest_core::UnpackOutcome;
use unnest_core::extraction::RecursiveOpener;
use unnest_core::formats::detect::detect_format;
use unnest_core::io::read_to_max;
use unnest_core::security::Deadline;
use unnest_core::security::ExtractionSession;
use unnest_core::test_utils::create_test_zip;
use unnest_core::test_utils::gzip_compress;
use unnest_core::unpack_stream;

proptest! {
    /// Leaf content is reproduced exactly, in bounded non-empty chunks.
    #[test]
    fn prop_leaf_chunks_reproduce_input(
        data in proptest::collection::vec(any::<u8>(), 0..20_000),
        chunk_size in 1usize..4096,
    ) {
        prop_assume!(detect_format(&data).is_none());

        let config = UnpackConfig::default().with_leaf_chunk_size(chunk_size);
        let session = ExtractionSession::new(config, Deadline::never());
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        RecursiveOpener::new(&session, &mut chunks)
            .open(1, &mut data.as_slice())
            .unwrap();

        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= chunk_size));
        prop_assert_eq!(chunks.concat(), data);
    }

    /// Plain content at the top level never produces output.
    #[test]
    fn prop_top_level_plain_content_emits_nothing(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        prop_assume!(detect_format(&data).is_none());

        let mut stream = unpack_stream(Cursor::new(data), UnpackConfig::default());
        prop_assert_eq!(stream.by_ref().count(), 0);
        prop_assert!(matches!(stream.finish().outcome, UnpackOutcome::NotAnArchive));
    }

    /// The bounded reader never stops more than one increment past the cap.
    #[test]
    fn prop_bounded_read_respects_cap(
        len in 0usize..50_000,
        cap in 1u64..20_000,
        increment in 1usize..2048,
    ) {
        let config = UnpackConfig::default()
            .with_max_total_size(cap)
            .with_read_increment(increment);
        let session = ExtractionSession::new(config, Deadline::never());

        let data = vec![0x5A; len];
        let read = read_to_max(&session, &mut data.as_slice()).unwrap();

        prop_assert_eq!(&read[..], &data[..read.len()]);
        prop_assert!(read.len() as u64 <= cap + increment as u64);
        prop_assert_eq!(session.bytes_read(), read.len() as u64);
        if (len as u64) < cap {
            prop_assert_eq!(read.len(), len);
        }
    }

    /// Every non-archive member of a container is emitted once, in order.
    #[test]
    fn prop_container_members_in_order(
        contents in proptest::collection::vec("[a-z]{1,64}", 1..12),
    ) {
        let names: Vec<String> = (0..contents.len()).map(|i| format!("m{i:02}.txt")).collect();
        let zip = create_test_zip(
            names
                .iter()
                .zip(&contents)
                .map(|(name, content)| (name.as_str(), content.as_bytes()))
                .collect(),
        );

        let mut stream = unpack_stream(Cursor::new(gzip_compress(&zip)), UnpackConfig::default());
        let chunks: Vec<Vec<u8>> = stream.by_ref().collect();
        let expected: Vec<Vec<u8>> = contents.iter().map(|c| c.as_bytes().to_vec()).collect();

        prop_assert_eq!(chunks, expected);
        prop_assert!(stream.finish().is_success());
    }
}
