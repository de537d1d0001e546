//! Property tests for encoding repair.

use onix_feed::encoding::{normalize_bytes, normalize_bytes_parallel, normalize_file};
use onix_feed::NormalizeOptions;
use proptest::prelude::*;
use std::io::Write;

/// Bytes biased towards the sequences the repair pass cares about.
fn feed_bytes() -> impl Strategy<Value = Vec<u8>> {
    let piece = prop_oneof![
        Just(b"\n".to_vec()),
        Just(b"<a>".to_vec()),
        Just(b"&eacute;".to_vec()),
        Just(b"&amp;".to_vec()),
        Just(b"&#1;".to_vec()),
        Just(b"& ".to_vec()),
        Just("caf\u{e9}".as_bytes().to_vec()),
        Just(vec![0xE2, 0x82]),
        Just(vec![0xE9]),
        Just(vec![0x01]),
        any::<u8>().prop_map(|b| vec![b]),
    ];
    proptest::collection::vec(piece, 0..200).prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    fn parallel_matches_sequential(
        input in feed_bytes(),
        chunk_size in 1usize..64,
        filter in any::<bool>(),
        compose in any::<bool>(),
    ) {
        let options = NormalizeOptions::default()
            .with_filter(filter)
            .with_composition(compose)
            .with_chunk_size(chunk_size);

        let sequential = normalize_bytes(&input, &options);
        let parallel = normalize_bytes_parallel(&input, &options);
        prop_assert_eq!(sequential, parallel);
    }

    #[test]
    fn output_is_stable(input in feed_bytes(), filter in any::<bool>()) {
        let options = NormalizeOptions::default().with_filter(filter);
        let (once, _) = normalize_bytes(&input, &options);
        let (twice, report) = normalize_bytes(once.as_bytes(), &options);

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(report.transcoded_bytes, 0);
        prop_assert_eq!(report.dropped_bytes, 0);
    }
}

#[test]
fn test_file_is_only_rewritten_when_dirty() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"<a>clean</a>\n").unwrap();
    file.flush().unwrap();

    let report = normalize_file(file.path(), &NormalizeOptions::default()).unwrap();
    assert!(report.is_clean());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"<a>\x93quoted\x94 &eacute;</a>\n").unwrap();
    file.flush().unwrap();

    let options = NormalizeOptions::default().with_parallel(true).with_chunk_size(4);
    let report = normalize_file(file.path(), &options).unwrap();
    assert_eq!(report.transcoded_bytes, 2);
    assert_eq!(report.entities_rewritten, 1);
    assert_eq!(
        std::fs::read_to_string(file.path()).unwrap(),
        "<a>\u{201c}quoted\u{201d} &#233;</a>\n"
    );
}
