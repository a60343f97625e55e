//! The piece-verification engine (spec component C5).
//!
//! Streams each piece's fragments off disk, assembles them into a
//! contiguous buffer no larger than `piece_length`, and compares its
//! SHA-1 digest against the torrent's expected hash. Never buffers the
//! full content tree.
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use thiserror::Error;
use walkdir::WalkDir;

use crate::torrent::{component_to_os_string, Fragment, Torrent};

/// Options governing a single verification run. Mirrors the flags the
/// verification CLI exposes (spec §6.3).
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Stop at the first piece that reports any error.
    pub fail_fast: bool,
    /// If set, every piece that hashes correctly is additionally
    /// written to `extract_dir / <piece_index>`.
    pub extract_dir: Option<PathBuf>,
}

/// Why a single fragment could not be read in full.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyIssue {
    #[error("{path}: {source}")]
    Open { path: PathBuf, source: String },

    #[error("{path}: expected size {expected}, found {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{path}: short read at offset {offset}, expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("failed to write extracted piece {index}: {source}")]
    ExtractWrite { index: u64, source: String },
}

/// Outcome of verifying a single piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceStatus {
    Ok,
    HashMismatch,
    AcquisitionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceReport {
    pub index: u64,
    pub status: PieceStatus,
    pub issues: Vec<VerifyIssue>,
    /// Fragment descriptors, in order, annotated with whether each
    /// covers its file completely (used by CLIs to decorate progress
    /// lines with leading/trailing `...`).
    pub fragments: Vec<FragmentDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDescriptor {
    pub path: Vec<Vec<u8>>,
    pub range: std::ops::Range<u64>,
    pub file_length: u64,
}

impl FragmentDescriptor {
    pub fn covers_whole_file(&self) -> bool {
        self.range.start == 0 && self.range.end == self.file_length
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifySummary {
    pub valid_pieces: u64,
    pub piece_count: u64,
    pub errors_detected: bool,
    pub extra_files: Vec<PathBuf>,
    pub reports: Vec<PieceReport>,
}

impl VerifySummary {
    /// 0 iff no errors were detected anywhere in the run, 1 otherwise,
    /// matching the verification tool's process exit code.
    pub fn exit_code(&self) -> i32 {
        if self.errors_detected {
            1
        } else {
            0
        }
    }
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("failed to create extraction directory: {0}")]
    ExtractDirCreate(#[from] std::io::Error),
}

fn fragment_file_path(content_root: &Path, torrent: &Torrent, fragment: &Fragment) -> PathBuf {
    if torrent.multifile() {
        let mut path = content_root.to_path_buf();
        for component in &fragment.path {
            path.push(component_to_os_string(component));
        }
        path
    } else {
        content_root.to_path_buf()
    }
}

struct OpenFileCache {
    path: PathBuf,
    file: File,
}

/// Reads into `buf` until it is full or the file is exhausted,
/// returning the number of bytes actually read.
fn read_fully(file: &mut File, buf: &mut [u8]) -> usize {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(_) => break,
        }
    }
    total
}

/// Verifies `torrent`'s content against `content_root`, returning a
/// summary covering every piece plus any extra on-disk files.
pub fn verify(
    torrent: &Torrent,
    content_root: &Path,
    options: &VerifyOptions,
) -> Result<VerifySummary, VerifyError> {
    if let Some(dir) = &options.extract_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut valid_pieces: u64 = 0;
    let mut errors_detected = false;
    let mut reports = Vec::new();
    let mut cache: Option<OpenFileCache> = None;

    // Seeded from every file the torrent declares, not just the ones
    // a piece fragment happens to touch: a zero-length file (or a
    // torrent whose total length is zero, so no piece is ever
    // yielded) would otherwise spuriously show up as "extra".
    let mut declared_paths: BTreeSet<PathBuf> = torrent
        .each_file()
        .into_iter()
        .map(|file| {
            let mut path = content_root.to_path_buf();
            if torrent.multifile() {
                for component in &file.path {
                    path.push(component_to_os_string(component));
                }
            }
            path
        })
        .collect();

    for piece in torrent.pieces() {
        let mut issues = Vec::new();
        let mut acquisition_failed = false;
        let mut assembled = Vec::new();
        let mut descriptors = Vec::with_capacity(piece.fragments.len());

        for fragment in &piece.fragments {
            let file_path = fragment_file_path(content_root, torrent, fragment);
            declared_paths.insert(file_path.clone());
            descriptors.push(FragmentDescriptor {
                path: fragment.path.clone(),
                range: fragment.range.clone(),
                file_length: fragment.file_length,
            });

            let file = match cache.take() {
                Some(cached) if cached.path == file_path => Some(cached.file),
                _ => match File::open(&file_path) {
                    Ok(f) => Some(f),
                    Err(e) => {
                        issues.push(VerifyIssue::Open {
                            path: file_path.clone(),
                            source: e.to_string(),
                        });
                        acquisition_failed = true;
                        errors_detected = true;
                        None
                    }
                },
            };

            let Some(mut file) = file else { continue };

            match file.metadata() {
                Ok(meta) if meta.len() != fragment.file_length => {
                    issues.push(VerifyIssue::SizeMismatch {
                        path: file_path.clone(),
                        expected: fragment.file_length,
                        actual: meta.len(),
                    });
                    errors_detected = true;
                }
                Err(e) => {
                    issues.push(VerifyIssue::Open {
                        path: file_path.clone(),
                        source: e.to_string(),
                    });
                    acquisition_failed = true;
                    errors_detected = true;
                    continue;
                }
                Ok(_) => {}
            }

            let want = (fragment.range.end - fragment.range.start) as usize;
            let mut buf = vec![0u8; want];
            let got = match file.seek(SeekFrom::Start(fragment.range.start)) {
                Ok(_) => read_fully(&mut file, &mut buf),
                Err(_) => 0,
            };
            if got != want {
                issues.push(VerifyIssue::ShortRead {
                    path: file_path.clone(),
                    offset: fragment.range.start,
                    expected: want as u64,
                    actual: got as u64,
                });
                acquisition_failed = true;
                errors_detected = true;
                continue;
            }
            assembled.extend_from_slice(&buf);

            cache = Some(OpenFileCache {
                path: file_path,
                file,
            });
        }

        let status = if acquisition_failed {
            PieceStatus::AcquisitionFailed
        } else {
            let mut hasher = Sha1::new();
            hasher.update(&assembled);
            let digest = hasher.finalize();
            if digest.as_slice() == torrent.piece_hash(piece.index) {
                valid_pieces += 1;
                if let Some(dir) = &options.extract_dir {
                    let out_path = dir.join(piece.index.to_string());
                    if let Err(e) = std::fs::File::create(&out_path)
                        .and_then(|mut f| f.write_all(&assembled))
                    {
                        issues.push(VerifyIssue::ExtractWrite {
                            index: piece.index,
                            source: e.to_string(),
                        });
                    }
                }
                PieceStatus::Ok
            } else {
                errors_detected = true;
                PieceStatus::HashMismatch
            }
        };

        let piece_had_error = !issues.is_empty() || matches!(status, PieceStatus::HashMismatch);
        reports.push(PieceReport {
            index: piece.index,
            status,
            issues,
            fragments: descriptors,
        });

        if options.fail_fast && piece_had_error {
            break;
        }
    }

    let extra_files = if torrent.multifile() {
        find_extra_files(content_root, &declared_paths)
    } else {
        Vec::new()
    };

    Ok(VerifySummary {
        valid_pieces,
        piece_count: torrent.piece_count(),
        errors_detected,
        extra_files,
        reports,
    })
}

fn find_extra_files(content_root: &Path, declared: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
    if !content_root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(content_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| !declared.contains(path))
        .collect()
}
