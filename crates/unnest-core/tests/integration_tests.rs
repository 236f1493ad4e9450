//! Integration tests for unnest-core.
//!
//! These tests drive whole calls through the public entry points and
//! observe only what a consumer can: the chunk stream and the summary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;
use std::time::Duration;

use unnest_core::MemberFailurePolicy;
use unnest_core::UnpackConfig;
use unnest_core::UnpackError;
use unnest_core::UnpackOutcome;
use unnest_core::UnpackSummary;
use unnest_core::test_utils::TarTestBuilder;
use unnest_core::test_utils::ZipTestBuilder;
use unnest_core::test_utils::bzip2_compress;
use unnest_core::test_utils::create_raw_zip;
use unnest_core::test_utils::create_test_rar;
use unnest_core::test_utils::create_test_tar;
use unnest_core::test_utils::create_test_zip;
use unnest_core::test_utils::gzip_compress;
use unnest_core::test_utils::nested_gzip;
use unnest_core::test_utils::xz_compress;
use unnest_core::test_utils::zstd_compress;
use unnest_core::unpack_stream;

fn unpack_all(data: Vec<u8>, config: UnpackConfig) -> (Vec<Vec<u8>>, UnpackSummary) {
    let mut stream = unpack_stream(Cursor::new(data), config);
    let chunks = stream.by_ref().collect();
    (chunks, stream.finish())
}

#[test]
fn test_plain_input_emits_nothing() {
    let (chunks, summary) = unpack_all(b"AWS_SECRET=abc".to_vec(), UnpackConfig::default());
    assert!(chunks.is_empty());
    assert!(summary.is_success());
    assert!(matches!(summary.outcome, UnpackOutcome::NotAnArchive));
    assert_eq!(summary.leaf_chunks, 0);
}

#[test]
fn test_empty_input_emits_nothing() {
    let (chunks, summary) = unpack_all(Vec::new(), UnpackConfig::default());
    assert!(chunks.is_empty());
    assert!(matches!(summary.outcome, UnpackOutcome::NotAnArchive));
}

#[test]
fn test_every_codec_over_tar() {
    let tar = create_test_tar(vec![("id_rsa", b"-----BEGIN-----")]);
    let inputs = [
        gzip_compress(&tar),
        bzip2_compress(&tar),
        xz_compress(&tar),
        zstd_compress(&tar),
    ];

    for input in inputs {
        let (chunks, summary) = unpack_all(input, UnpackConfig::default());
        assert_eq!(chunks, vec![b"-----BEGIN-----".to_vec()]);
        assert!(summary.is_success());
        assert_eq!(summary.max_depth_reached, 2);
    }
}

#[test]
fn test_members_emitted_in_archive_order() {
    let tar = TarTestBuilder::new()
        .add_file("z.txt", b"last-name-first")
        .add_directory("dir/")
        .add_file("dir/a.txt", b"second")
        .add_symlink("link", "z.txt")
        .add_file("m.txt", b"third")
        .build();

    let (chunks, summary) = unpack_all(tar, UnpackConfig::default());
    assert_eq!(
        chunks,
        vec![
            b"last-name-first".to_vec(),
            b"second".to_vec(),
            b"third".to_vec()
        ]
    );
    assert_eq!(summary.members_visited, 3);
}

#[test]
fn test_nested_containers() {
    let inner_tar = create_test_tar(vec![("creds.json", b"{\"token\":\"t\"}")]);
    let zip = ZipTestBuilder::new()
        .add_file("readme.md", b"hello")
        .add_deflated_file("layer.tar.gz", &gzip_compress(&inner_tar))
        .add_directory("empty/")
        .build();

    let (chunks, summary) = unpack_all(zip, UnpackConfig::default());
    assert_eq!(
        chunks,
        vec![b"hello".to_vec(), b"{\"token\":\"t\"}".to_vec()]
    );
    assert!(summary.is_success());
    assert_eq!(summary.max_depth_reached, 3);
}

#[test]
fn test_depth_limit_boundary() {
    let config = UnpackConfig::default().with_max_depth(3);

    let (chunks, summary) = unpack_all(nested_gzip(b"core", 2), config.clone());
    assert_eq!(chunks, vec![b"core".to_vec()]);
    assert!(summary.is_success());

    let (chunks, summary) = unpack_all(nested_gzip(b"core", 3), config);
    assert!(chunks.is_empty());
    assert!(matches!(
        summary.error(),
        Some(UnpackError::MaxDepthExceeded { depth: 3, max: 3 })
    ));
}

#[test]
fn test_default_depth_limit() {
    let (chunks, summary) = unpack_all(nested_gzip(b"core", 4), UnpackConfig::default());
    assert_eq!(chunks, vec![b"core".to_vec()]);
    assert!(summary.is_success());

    let (chunks, summary) = unpack_all(nested_gzip(b"core", 5), UnpackConfig::default());
    assert!(chunks.is_empty());
    assert!(matches!(
        summary.error(),
        Some(UnpackError::MaxDepthExceeded { depth: 5, max: 5 })
    ));
}

#[test]
fn test_depth_failure_aborts_siblings_by_default() {
    let zip = create_test_zip(vec![
        ("ok.txt", b"first".as_slice()),
        ("deep.gz", nested_gzip(b"x", 3).as_slice()),
        ("after.txt", b"never".as_slice()),
    ]);
    let config = UnpackConfig::default().with_max_depth(2);

    let (chunks, summary) = unpack_all(zip, config);
    assert_eq!(chunks, vec![b"first".to_vec()]);
    assert!(matches!(
        summary.error(),
        Some(UnpackError::MaxDepthExceeded { .. })
    ));
}

#[test]
fn test_isolated_member_failure_continues() {
    let zip = create_test_zip(vec![
        ("ok.txt", b"first".as_slice()),
        ("deep.gz", nested_gzip(b"x", 3).as_slice()),
        ("after.txt", b"second".as_slice()),
    ]);
    let config = UnpackConfig::default()
        .with_max_depth(2)
        .with_member_failure_policy(MemberFailurePolicy::IsolateMember);

    let (chunks, summary) = unpack_all(zip, config);
    assert_eq!(chunks, vec![b"first".to_vec(), b"second".to_vec()]);
    assert!(summary.is_success());
    assert_eq!(summary.members_failed, 1);
}

#[test]
fn test_large_leaf_is_chunked() {
    let payload: Vec<u8> = (0..25_000u32).map(|i| (i % 251) as u8).collect();
    let config = UnpackConfig::default().with_leaf_chunk_size(10 * 1024);

    let (chunks, summary) = unpack_all(gzip_compress(&payload), config);
    let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10 * 1024, 10 * 1024, 25_000 - 20 * 1024]);
    assert_eq!(chunks.concat(), payload);
    assert_eq!(summary.leaf_bytes, 25_000);
}

#[test]
fn test_size_cap_is_soft() {
    let config = UnpackConfig::default().with_max_total_size(4096);
    let bomb = gzip_compress(&vec![0u8; 1024 * 1024]);

    let (chunks, summary) = unpack_all(bomb, config);
    assert_eq!(chunks.concat().len(), 4096);
    assert!(summary.is_success());
    assert!(summary.size_cap_reached);
    assert_eq!(summary.bytes_read, 4096);
}

#[test]
fn test_budget_is_shared_between_siblings() {
    let big = vec![b'a'; 3000];
    let zip = create_test_zip(vec![
        ("one.txt", big.as_slice()),
        ("two.txt", big.as_slice()),
        ("three.txt", big.as_slice()),
    ]);
    let zip_len = zip.len();
    let config = UnpackConfig::default().with_max_total_size(zip_len as u64 + 4096);

    let (chunks, summary) = unpack_all(zip, config);
    assert!(summary.is_success());
    assert!(summary.size_cap_reached);
    assert!(chunks.concat().len() < 3 * 3000);
}

#[test]
fn test_rar_inside_gzip() {
    let inner_tar = create_test_tar(vec![("deploy/key.pem", b"-----BEGIN KEY-----")]);
    let rar = create_test_rar(vec![
        ("readme.txt", b"docs".as_slice()),
        ("bundle.tar", inner_tar.as_slice()),
    ]);

    let (chunks, summary) = unpack_all(gzip_compress(&rar), UnpackConfig::default());
    assert_eq!(
        chunks,
        vec![b"docs".to_vec(), b"-----BEGIN KEY-----".to_vec()]
    );
    assert!(summary.is_success());
    // gzip, rar, tar, key.pem
    assert_eq!(summary.max_depth_reached, 3);
}

#[test]
fn test_zip_members_with_other_methods() {
    let content = b"db_password=correct-horse";
    let inputs = [
        create_raw_zip("a.cfg", 12, &bzip2_compress(content), content),
        create_raw_zip("b.cfg", 93, &zstd_compress(content), content),
    ];

    for input in inputs {
        let (chunks, summary) = unpack_all(input, UnpackConfig::default());
        assert_eq!(chunks, vec![content.to_vec()]);
        assert!(summary.is_success());
    }
}

#[test]
fn test_corrupt_sevenz_fails() {
    let mut data = vec![b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C, 0x00, 0x04];
    data.extend(std::iter::repeat_n(0xCD, 128));

    let (chunks, summary) = unpack_all(data, UnpackConfig::default());
    assert!(chunks.is_empty());
    assert!(matches!(summary.outcome, UnpackOutcome::Failed(_)));
    assert!(!summary.error().is_some_and(UnpackError::is_benign));
}

#[test]
fn test_corrupt_gzip_member_fails_call() {
    let zip = create_test_zip(vec![
        ("ok.txt", b"kept".as_slice()),
        ("broken.gz", [0x1F, 0x8B, 0x08, 0x00, 0xFF, 0xFF].as_slice()),
    ]);

    let (chunks, summary) = unpack_all(zip, UnpackConfig::default());
    assert_eq!(chunks, vec![b"kept".to_vec()]);
    assert!(matches!(summary.outcome, UnpackOutcome::Failed(_)));
}

#[test]
fn test_cancel_stops_emission() {
    let mut builder = TarTestBuilder::new();
    for i in 0..200 {
        builder = builder.add_file(&format!("file{i:03}.txt"), format!("value {i}").as_bytes());
    }
    let config = UnpackConfig::default().with_channel_capacity(1);

    let mut stream = unpack_stream(Cursor::new(builder.build()), config);
    assert!(stream.next().is_some());
    stream.cancel();

    let remaining = stream.by_ref().count();
    assert!(remaining < 199);

    let summary = stream.finish();
    assert!(matches!(summary.error(), Some(UnpackError::Cancelled)));
}

#[test]
fn test_timeout_reported() {
    struct Endless;
    impl std::io::Read for Endless {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(Duration::from_millis(1));
            buf.fill(b'z');
            Ok(buf.len())
        }
    }

    // A member that claims a terabyte, backed by a reader that never ends
    let mut header = tar::Header::new_gnu();
    header.set_path("huge.log").unwrap();
    header.set_size(1 << 40);
    header.set_mode(0o644);
    header.set_cksum();
    let input = std::io::Read::chain(Cursor::new(header.as_bytes().to_vec()), Endless);

    let config = UnpackConfig::default()
        .with_max_duration(Duration::from_millis(50))
        .with_max_total_size(u64::MAX / 2);

    let mut stream = unpack_stream(input, config);
    assert_eq!(stream.by_ref().count(), 0);
    assert!(matches!(stream.finish().error(), Some(UnpackError::TimedOut)));
}

#[test]
fn test_invalid_config_rejected() {
    let config = UnpackConfig::default().with_read_increment(0);
    let (chunks, summary) = unpack_all(gzip_compress(b"x"), config);
    assert!(chunks.is_empty());
    assert!(matches!(
        summary.error(),
        Some(UnpackError::InvalidConfig { .. })
    ));
}

#[tokio::test]
async fn test_async_consumer() {
    let tar = create_test_tar(vec![("a", b"one"), ("b", b"two")]);
    let mut stream = unpack_stream(Cursor::new(zstd_compress(&tar)), UnpackConfig::default());

    let mut chunks = Vec::new();
    while let Some(chunk) = stream.recv().await {
        chunks.push(chunk);
    }
    assert_eq!(chunks, vec![b"one".to_vec(), b"two".to_vec()]);
}
