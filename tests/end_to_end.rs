//! End-to-end scenarios spanning the codec, torrent model, piece
//! iterator, verifier, and atomic writer together, per the testable
//! properties enumerated in the design spec.
use std::collections::BTreeMap;
use std::io::Write;

use sha1::{Digest, Sha1};

use bencode_tools::bencode::{decode, encode, Value};
use bencode_tools::select::{self, Selector};
use bencode_tools::torrent::Torrent;
use bencode_tools::verify::{self, PieceStatus, VerifyOptions};
use bencode_tools::write;

fn piece_hash(bytes: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

fn build_multifile_torrent(piece_length: u64, file_contents: &[&[u8]]) -> (Vec<u8>, Vec<u8>) {
    let total_length: u64 = file_contents.iter().map(|c| c.len() as u64).sum();
    let piece_count = total_length.div_ceil(piece_length);

    let mut concatenated = Vec::new();
    for content in file_contents {
        concatenated.extend_from_slice(content);
    }

    let mut pieces = Vec::new();
    for i in 0..piece_count {
        let start = (i * piece_length) as usize;
        let end = (start + piece_length as usize).min(concatenated.len());
        pieces.extend_from_slice(&piece_hash(&concatenated[start..end]));
    }

    let mut files_list = Vec::new();
    for (i, content) in file_contents.iter().enumerate() {
        let mut entry = BTreeMap::new();
        entry.insert(b"length".to_vec(), Value::Integer(content.len() as i64));
        entry.insert(
            b"path".to_vec(),
            Value::List(vec![Value::Bytes(format!("file{i}.bin").into_bytes())]),
        );
        files_list.push(Value::Dict(entry));
    }

    let mut info = BTreeMap::new();
    info.insert(b"name".to_vec(), Value::Bytes(b"bundle".to_vec()));
    info.insert(b"piece length".to_vec(), Value::Integer(piece_length as i64));
    info.insert(b"pieces".to_vec(), Value::Bytes(pieces));
    info.insert(b"files".to_vec(), Value::List(files_list));

    let mut root = BTreeMap::new();
    root.insert(b"info".to_vec(), Value::Dict(info));

    (encode(&Value::Dict(root)), concatenated)
}

#[test]
fn decode_encode_round_trip_is_the_identity() {
    let input: &[u8] = b"d3:cow3:moo4:spam4:eggse";
    let value = decode(input).unwrap();
    assert_eq!(encode(&value), input);
}

#[test]
fn decoder_rejects_noncanonical_integer_forms() {
    assert!(decode(b"i00e").is_err());
    assert!(decode(b"i-0e").is_err());
    assert!(decode(b"i+5e").is_err());
}

#[test]
fn piece_iterator_crosses_file_boundaries_with_four_byte_pieces() {
    let (meta, _) = build_multifile_torrent(4, &[b"abc", b"defgh"]);
    let torrent = Torrent::parse(&meta).unwrap();

    let pieces: Vec<_> = torrent.pieces().collect();
    // total length 8, piece_length 4 => 2 pieces
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0].fragments.len(), 2);
    assert_eq!(pieces[0].fragments[0].range, 0..3);
    assert_eq!(pieces[0].fragments[1].range, 0..1);
    assert_eq!(pieces[1].fragments.len(), 1);
    assert_eq!(pieces[1].fragments[0].range, 1..5);
}

#[test]
fn verifier_passes_against_a_correctly_laid_out_content_tree() {
    let (meta, _) = build_multifile_torrent(4, &[b"abc", b"defgh"]);
    let torrent = Torrent::parse(&meta).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("bundle");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::File::create(root.join("file0.bin"))
        .unwrap()
        .write_all(b"abc")
        .unwrap();
    std::fs::File::create(root.join("file1.bin"))
        .unwrap()
        .write_all(b"defgh")
        .unwrap();

    let summary = verify::verify(&torrent, &root, &VerifyOptions::default()).unwrap();
    assert_eq!(summary.valid_pieces, summary.piece_count);
    assert!(!summary.errors_detected);
    assert!(summary.extra_files.is_empty());
    assert!(summary
        .reports
        .iter()
        .all(|r| r.status == PieceStatus::Ok));
}

#[test]
fn verifier_reports_extra_files_without_marking_errors() {
    let (meta, _) = build_multifile_torrent(4, &[b"abc", b"defgh"]);
    let torrent = Torrent::parse(&meta).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("bundle");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::File::create(root.join("file0.bin"))
        .unwrap()
        .write_all(b"abc")
        .unwrap();
    std::fs::File::create(root.join("file1.bin"))
        .unwrap()
        .write_all(b"defgh")
        .unwrap();
    std::fs::File::create(root.join("stray.txt"))
        .unwrap()
        .write_all(b"not part of the torrent")
        .unwrap();

    let summary = verify::verify(&torrent, &root, &VerifyOptions::default()).unwrap();
    assert!(!summary.errors_detected);
    assert_eq!(summary.extra_files.len(), 1);
    assert!(summary.extra_files[0].ends_with("stray.txt"));
}

#[test]
fn verifier_does_not_flag_a_zero_length_file_as_extra() {
    // file1 is zero-length and lands exactly at the end of the last
    // piece, the edge case where the piece iterator has no further
    // piece to sweep it up in.
    let (meta, _) = build_multifile_torrent(4, &[b"abcd", b""]);
    let torrent = Torrent::parse(&meta).unwrap();
    assert!(torrent.pieces().count() > 0);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("bundle");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::File::create(root.join("file0.bin"))
        .unwrap()
        .write_all(b"abcd")
        .unwrap();
    std::fs::File::create(root.join("file1.bin")).unwrap();

    let summary = verify::verify(&torrent, &root, &VerifyOptions::default()).unwrap();
    assert!(!summary.errors_detected);
    assert!(summary.extra_files.is_empty());
}

#[test]
fn atomic_writer_replaces_source_after_a_selector_edit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.torrent");

    let mut info = BTreeMap::new();
    info.insert(b"name".to_vec(), Value::Bytes(b"original".to_vec()));
    let mut root = BTreeMap::new();
    root.insert(b"info".to_vec(), Value::Dict(info));
    let mut tree = Value::Dict(root);
    std::fs::write(&path, encode(&tree)).unwrap();

    let selector = Selector::parse("info name");
    select::set(&mut tree, &selector, Value::Bytes(b"renamed".to_vec())).unwrap();
    write::write_atomic(&path, &tree).unwrap();

    let reloaded = decode(&std::fs::read(&path).unwrap()).unwrap();
    let selected = select::select(&reloaded, &selector).unwrap();
    assert_eq!(selected, &Value::Bytes(b"renamed".to_vec()));
}
