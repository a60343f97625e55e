//! The lazy piece iterator (spec component C4).
//!
//! Walks the torrent's file list in order, slicing it into
//! `piece_length`-sized pieces (the last piece may be shorter). Each
//! piece is returned as an ordered list of [`Fragment`]s, one per file
//! boundary the piece crosses.
use super::{FileEntry, Torrent};

/// The slice of one content file that falls inside a single piece.
/// The path is raw bytes, not `String`: bencoded byte strings are not
/// guaranteed to be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub path: Vec<Vec<u8>>,
    pub range: std::ops::Range<u64>,
    pub file_length: u64,
}

impl Fragment {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.start == self.range.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub index: u64,
    pub fragments: Vec<Fragment>,
}

/// An iterator over a torrent's pieces, in order.
///
/// Owns a cheap copy of the file list and the scalar dimensions it
/// needs rather than borrowing the `Torrent` itself, so it carries no
/// lifetime parameter.
pub struct PieceIter {
    files: Vec<FileEntry>,
    piece_length: u64,
    piece_count: u64,
    total_length: u64,
    cur_piece: u64,
    file_index: usize,
    start_offset: u64,
}

impl PieceIter {
    pub(super) fn new(torrent: &Torrent) -> Self {
        PieceIter {
            files: torrent.each_file(),
            piece_length: torrent.piece_length(),
            piece_count: torrent.piece_count(),
            total_length: torrent.total_length(),
            cur_piece: 0,
            file_index: 0,
            start_offset: 0,
        }
    }
}

impl Iterator for PieceIter {
    type Item = Piece;

    fn next(&mut self) -> Option<Piece> {
        if self.cur_piece >= self.piece_count {
            return None;
        }

        let mut remaining = if self.cur_piece + 1 == self.piece_count {
            self.total_length - (self.piece_count - 1) * self.piece_length
        } else {
            self.piece_length
        };

        let mut fragments = Vec::new();
        while remaining > 0 {
            let file = self
                .files
                .get(self.file_index)
                .expect("piece iterator ran past the last file of a validated torrent");
            let file_remaining = file.length - self.start_offset;
            if file_remaining <= remaining {
                fragments.push(Fragment {
                    path: file.path.clone(),
                    range: self.start_offset..file.length,
                    file_length: file.length,
                });
                remaining -= file_remaining;
                self.file_index += 1;
                self.start_offset = 0;
            } else {
                fragments.push(Fragment {
                    path: file.path.clone(),
                    range: self.start_offset..self.start_offset + remaining,
                    file_length: file.length,
                });
                self.start_offset += remaining;
                remaining = 0;
            }
        }

        let index = self.cur_piece;
        self.cur_piece += 1;

        // Zero-length files sitting at the cursor right when a piece
        // boundary lands exactly on a file boundary would otherwise
        // never be visited: the next piece's loop is what normally
        // sweeps them up, but the last piece has no next iteration.
        // Attach them here so `file_index` reaches `files.len()` by
        // the time the iterator is exhausted.
        if self.cur_piece == self.piece_count {
            while let Some(file) = self.files.get(self.file_index) {
                if file.length != 0 || self.start_offset != 0 {
                    break;
                }
                fragments.push(Fragment {
                    path: file.path.clone(),
                    range: 0..0,
                    file_length: 0,
                });
                self.file_index += 1;
            }
        }

        Some(Piece { index, fragments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(lengths: &[u64]) -> Vec<FileEntry> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &length)| FileEntry {
                path: vec![format!("f{i}").into_bytes()],
                length,
            })
            .collect()
    }

    fn iter_over(lengths: &[u64], piece_length: u64) -> PieceIter {
        let total_length: u64 = lengths.iter().sum();
        let piece_count = total_length.div_ceil(piece_length);
        PieceIter {
            files: files(lengths),
            piece_length,
            piece_count,
            total_length,
            cur_piece: 0,
            file_index: 0,
            start_offset: 0,
        }
    }

    #[test]
    fn single_file_exact_multiple() {
        let pieces: Vec<_> = iter_over(&[8], 4).collect();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].fragments.len(), 1);
        assert_eq!(pieces[0].fragments[0].range, 0..4);
        assert_eq!(pieces[1].fragments[0].range, 4..8);
    }

    #[test]
    fn piece_crosses_file_boundary() {
        // files of length 3 and 5, piece_length 4: pieces are
        // [0..3 of f0, 0..1 of f1], [1..4 of f1], [4..5 of f1]
        let pieces: Vec<_> = iter_over(&[3, 5], 4).collect();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].fragments.len(), 2);
        assert_eq!(pieces[0].fragments[0].path, vec![b"f0".to_vec()]);
        assert_eq!(pieces[0].fragments[0].range, 0..3);
        assert_eq!(pieces[0].fragments[1].path, vec![b"f1".to_vec()]);
        assert_eq!(pieces[0].fragments[1].range, 0..1);
        assert_eq!(pieces[1].fragments.len(), 1);
        assert_eq!(pieces[1].fragments[0].range, 1..5);
    }

    #[test]
    fn zero_length_file_between_nonempty_files() {
        let pieces: Vec<_> = iter_over(&[2, 0, 2], 4).collect();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].fragments.len(), 3);
        assert!(pieces[0].fragments[1].is_empty());
    }

    #[test]
    fn total_bytes_covered_matches_total_length() {
        let lengths = [3u64, 5, 0, 12];
        let total: u64 = lengths.iter().sum();
        let covered: u64 = iter_over(&lengths, 4)
            .flat_map(|p| p.fragments)
            .map(|f| f.len())
            .sum();
        assert_eq!(covered, total);
    }

    #[test]
    fn no_files_yields_no_pieces() {
        assert_eq!(iter_over(&[], 4).count(), 0);
    }

    #[test]
    fn trailing_zero_length_file_is_attached_to_last_piece() {
        // file0 exactly fills the only piece; file1 is a trailing
        // zero-length file that would otherwise never be visited.
        let pieces: Vec<_> = iter_over(&[4, 0], 4).collect();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].fragments.len(), 2);
        assert_eq!(pieces[0].fragments[1].path, vec![b"f1".to_vec()]);
        assert!(pieces[0].fragments[1].is_empty());
    }
}
