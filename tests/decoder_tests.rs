//! Filter-stream decoder tests against synthetic resource blobs.

mod helpers;

use std::fs;
use tempfile::TempDir;
use wimstage::decoder;

#[test]
fn synthetic_blob_materializes_files() {
    let tmp = TempDir::new().unwrap();
    let blob_bytes = helpers::build_resource_blob(&[
        ("UpdateAgent.exe", b"agent executable body".as_ref()),
        ("UpdateAgentBroker.exe", b"broker body".as_ref()),
        ("docs/notes.txt", b"plain text payload".as_ref()),
    ]);
    let blob = tmp.path().join("102");
    fs::write(&blob, blob_bytes).unwrap();

    let dest = tmp.path().join("decoded");
    decoder::decode(&blob, &dest).unwrap();

    assert_eq!(
        fs::read(dest.join("UpdateAgent.exe")).unwrap(),
        b"agent executable body"
    );
    assert_eq!(fs::read(dest.join("UpdateAgentBroker.exe")).unwrap(), b"broker body");
    assert_eq!(
        fs::read(dest.join("docs/notes.txt")).unwrap(),
        b"plain text payload"
    );
}

#[test]
fn decode_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    let blob_bytes =
        helpers::build_resource_blob(&[("UpdateAgent.exe", b"same bytes every time".as_ref())]);
    let blob = tmp.path().join("102");
    fs::write(&blob, blob_bytes).unwrap();

    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    decoder::decode(&blob, &first).unwrap();
    decoder::decode(&blob, &second).unwrap();

    assert_eq!(helpers::tree_snapshot(&first), helpers::tree_snapshot(&second));
}

#[test]
fn non_lzma_blob_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let blob = tmp.path().join("102");
    fs::write(&blob, b"garbage that is not compressed").unwrap();

    let err = decoder::decode(&blob, &tmp.path().join("decoded")).unwrap_err();
    assert!(err.to_string().contains("LZMA"));
}

#[test]
fn truncated_framing_is_an_error() {
    // Valid LZMA stream whose decompressed payload is shorter than the
    // framing header.
    let tmp = TempDir::new().unwrap();

    let options = xz2::stream::LzmaOptions::new_preset(6).unwrap();
    let stream = xz2::stream::Stream::new_lzma_encoder(&options).unwrap();
    let mut encoder =
        xz2::read::XzEncoder::new_stream(std::io::Cursor::new(vec![0u8; 8]), stream);
    let mut blob_bytes = Vec::new();
    std::io::Read::read_to_end(&mut encoder, &mut blob_bytes).unwrap();

    let blob = tmp.path().join("102");
    fs::write(&blob, blob_bytes).unwrap();

    let err = decoder::decode(&blob, &tmp.path().join("decoded")).unwrap_err();
    assert!(err.to_string().contains("too small"));
}
