//! The atomic writer (spec component C7).
//!
//! Serializes a mutated tree through a staging file and replaces the
//! source file with a single rename, so a reader of `path` never
//! observes a partial write: either the original content is intact, or
//! the staging file's content has fully replaced it.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::bencode::{self, Value};

/// Writes `value`'s canonical encoding to a fresh staging file beside
/// `path`, then atomically renames it over `path`.
///
/// The staging file is named `dir/.{base}#{n}` for the smallest
/// positive `n` not already in use, created with exclusive-create
/// semantics so concurrent invocations never collide on the same
/// staging name. A process interrupted before the final rename leaves
/// `path` untouched and, at worst, a stray staging file that the next
/// invocation's retry loop tolerates by simply trying a fresh `n`.
#[tracing::instrument(skip(value), level = "debug")]
pub fn write_atomic(path: &Path, value: &Value) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .expect("write_atomic requires a path with a file name");

    let encoded = bencode::encode(value);
    let staging_path = create_staging_file(dir, base, &encoded)?;
    std::fs::rename(&staging_path, path)
}

fn create_staging_file(dir: &Path, base: &std::ffi::OsStr, content: &[u8]) -> std::io::Result<PathBuf> {
    let mut n: u32 = 1;
    loop {
        let mut name = std::ffi::OsString::from(".");
        name.push(base);
        name.push(format!("#{n}"));
        let staging_path = dir.join(&name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging_path)
        {
            Ok(mut file) => {
                file.write_all(content)?;
                return Ok(staging_path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                n += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Removes `path`. Used for the tree editor's remove-on-null-selector
/// case, which the selector engine itself refuses to handle.
pub fn unlink(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
}
