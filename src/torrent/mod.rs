//! The validated, immutable torrent model (spec component C3).
//!
//! [`Torrent::parse`] decodes a byte buffer, then validates the `info`
//! sub-tree, filename components, and the piece-count/`pieces`-length
//! cross-check, in that order. A successfully constructed [`Torrent`]
//! owns its decoded tree exclusively; everything else in this crate
//! that needs to look at the tree does so through `&Torrent`.
use std::ffi::OsString;

use thiserror::Error;

use crate::bencode::{self, DecodeError, Value};

pub mod pieces;
pub use pieces::{Fragment, Piece, PieceIter};

/// Converts a raw filename-component byte string into an `OsString`,
/// the way the component is actually represented on disk. Bencoded
/// byte strings carry no UTF-8 guarantee (spec §6.1), so this must
/// never round-trip through `String`.
#[cfg(unix)]
pub fn component_to_os_string(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
pub fn component_to_os_string(bytes: &[u8]) -> OsString {
    String::from_utf8_lossy(bytes).into_owned().into()
}

/// Why a structurally valid bencoded document isn't a valid torrent.
/// Carries a dotted path into the tree (e.g. `.info.files[3].length`)
/// and a human-readable reason, per spec §7's `InvalidTorrent` kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TorrentError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{path}: {reason}")]
    Invalid { path: String, reason: String },
}

impl TorrentError {
    fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TorrentError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type TorrentResult<T> = std::result::Result<T, TorrentError>;

/// One entry of a multi-file torrent's `info.files` list, or the
/// single synthesized entry for a single-file torrent. Each path
/// component is stored as raw bytes, not `String`: bencoded byte
/// strings are not guaranteed to be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: Vec<Vec<u8>>,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Torrent {
    data: Value,
    name: Vec<u8>,
    piece_length: u64,
    pieces: Vec<u8>,
    files: Option<Vec<FileEntry>>,
    single_length: u64,
    total_length: u64,
    piece_count: u64,
}

/// A non-empty byte string with no `/` that is neither `.` nor `..`.
fn is_valid_filename_component(bytes: &[u8]) -> bool {
    !bytes.is_empty() && !bytes.contains(&b'/') && bytes != b"." && bytes != b".."
}

impl Torrent {
    /// Decodes and validates a torrent from the raw bytes of a
    /// `.torrent` file.
    #[tracing::instrument(skip(input), level = "debug")]
    pub fn parse(input: &[u8]) -> TorrentResult<Torrent> {
        let data = bencode::decode(input)?;
        Torrent::from_value(data)
    }

    fn from_value(data: Value) -> TorrentResult<Torrent> {
        let root = data
            .as_dict()
            .ok_or_else(|| TorrentError::invalid(".", "root is not a dictionary"))?;

        let info_value = root
            .get(b"info".as_slice())
            .ok_or_else(|| TorrentError::invalid(".info", "missing"))?;
        let info = info_value
            .as_dict()
            .ok_or_else(|| TorrentError::invalid(".info", "not a dictionary"))?;

        let piece_length = match info.get(b"piece length".as_slice()) {
            Some(Value::Integer(n)) if *n > 0 => *n as u64,
            Some(Value::Integer(_)) => {
                return Err(TorrentError::invalid(".info.piece length", "must be positive"))
            }
            _ => {
                return Err(TorrentError::invalid(
                    ".info.piece length",
                    "missing or not an integer",
                ))
            }
        };

        let pieces = match info.get(b"pieces".as_slice()) {
            Some(Value::Bytes(b)) => b.clone(),
            _ => {
                return Err(TorrentError::invalid(
                    ".info.pieces",
                    "missing or not a byte string",
                ))
            }
        };

        let name = match info.get(b"name".as_slice()) {
            Some(Value::Bytes(b)) => b.clone(),
            _ => {
                return Err(TorrentError::invalid(
                    ".info.name",
                    "missing or not a byte string",
                ))
            }
        };
        if !is_valid_filename_component(&name) {
            return Err(TorrentError::invalid(
                ".info.name",
                "not a valid filename component",
            ));
        }

        let files_value = info.get(b"files".as_slice());
        let length_value = info.get(b"length".as_slice());
        if files_value.is_some() && length_value.is_some() {
            return Err(TorrentError::invalid(
                ".info",
                "files and length are mutually exclusive",
            ));
        }

        let mut saw_md5sum = info.contains_key(b"md5sum".as_slice());

        let (files, total_length) = if let Some(files_value) = files_value {
            let list = files_value
                .as_list()
                .ok_or_else(|| TorrentError::invalid(".info.files", "not a list"))?;
            if list.is_empty() {
                return Err(TorrentError::invalid(".info.files", "must not be empty"));
            }

            let mut entries = Vec::with_capacity(list.len());
            let mut total: u64 = 0;
            for (i, entry_value) in list.iter().enumerate() {
                let prefix = format!(".info.files[{i}]");
                let entry = entry_value
                    .as_dict()
                    .ok_or_else(|| TorrentError::invalid(prefix.clone(), "not a dictionary"))?;

                if entry.contains_key(b"md5sum".as_slice()) {
                    saw_md5sum = true;
                }

                let length = match entry.get(b"length".as_slice()) {
                    Some(Value::Integer(n)) if *n >= 0 => *n as u64,
                    Some(Value::Integer(_)) => {
                        return Err(TorrentError::invalid(
                            format!("{prefix}.length"),
                            "must be non-negative",
                        ))
                    }
                    _ => {
                        return Err(TorrentError::invalid(
                            format!("{prefix}.length"),
                            "missing or not an integer",
                        ))
                    }
                };

                let path_list = match entry.get(b"path".as_slice()) {
                    Some(Value::List(l)) if !l.is_empty() => l,
                    Some(Value::List(_)) => {
                        return Err(TorrentError::invalid(
                            format!("{prefix}.path"),
                            "must not be empty",
                        ))
                    }
                    _ => {
                        return Err(TorrentError::invalid(
                            format!("{prefix}.path"),
                            "missing or not a list",
                        ))
                    }
                };
                let mut path = Vec::with_capacity(path_list.len());
                for (j, component) in path_list.iter().enumerate() {
                    let component_path = format!("{prefix}.path[{j}]");
                    let bytes = component
                        .as_bytes()
                        .ok_or_else(|| TorrentError::invalid(component_path.clone(), "not a byte string"))?;
                    if !is_valid_filename_component(bytes) {
                        return Err(TorrentError::invalid(
                            component_path,
                            "not a valid filename component",
                        ));
                    }
                    path.push(bytes.to_vec());
                }

                total = total.checked_add(length).ok_or_else(|| {
                    TorrentError::invalid(format!("{prefix}.length"), "overflows total length")
                })?;
                entries.push(FileEntry { path, length });
            }
            (Some(entries), total)
        } else {
            let length = match length_value {
                Some(Value::Integer(n)) if *n >= 0 => *n as u64,
                Some(Value::Integer(_)) => {
                    return Err(TorrentError::invalid(".info.length", "must be non-negative"))
                }
                _ => {
                    return Err(TorrentError::invalid(
                        ".info.length",
                        "missing or not an integer",
                    ))
                }
            };
            (None, length)
        };

        if saw_md5sum {
            tracing::warn!("info.md5sum is present and is ignored for verification");
        }

        let piece_count = total_length.div_ceil(piece_length);
        if pieces.len() as u64 != piece_count * 20 {
            return Err(TorrentError::invalid(
                ".info.pieces",
                "length does not match the piece count implied by the content length",
            ));
        }

        let multifile = files.is_some();
        Ok(Torrent {
            data,
            name,
            piece_length,
            pieces,
            files,
            single_length: if multifile { 0 } else { total_length },
            total_length,
            piece_count,
        })
    }

    /// The whole decoded metainfo tree, unmodified.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The torrent's declared name, as raw bytes. Not guaranteed to be
    /// valid UTF-8; use [`component_to_os_string`] to turn it into a
    /// path component.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    pub fn piece_count(&self) -> u64 {
        self.piece_count
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn multifile(&self) -> bool {
        self.files.is_some()
    }

    /// The 20-byte SHA-1 hash expected for piece `index`.
    pub fn piece_hash(&self, index: u64) -> &[u8] {
        let start = (index as usize) * 20;
        &self.pieces[start..start + 20]
    }

    /// Yields `(relative_path, length)` per content file. In
    /// single-file mode this synthesizes a one-entry list with path
    /// `[name]`; in multi-file mode it returns the stored list.
    pub fn each_file(&self) -> Vec<FileEntry> {
        match &self.files {
            Some(files) => files.clone(),
            None => vec![FileEntry {
                path: vec![self.name.clone()],
                length: self.single_length,
            }],
        }
    }

    /// The lazy sequence of pieces, each an ordered list of fragments.
    pub fn pieces(&self) -> PieceIter {
        PieceIter::new(self)
    }
}
