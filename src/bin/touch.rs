//! `bencode-touch`, creates zero-length placeholder files (and their
//! ancestor directories) for every zero-length entry declared by one
//! or more torrents.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bencode_tools::torrent::{component_to_os_string, Torrent};

#[derive(Parser, Debug)]
#[command(author, version, about = "Create empty files for zero-length torrent entries")]
struct Args {
    /// Torrents whose zero-length entries should be materialized.
    torrents: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut had_error = false;

    for torrent_path in &args.torrents {
        if let Err(e) = touch_one(torrent_path) {
            eprintln!("{}: {e:#}", torrent_path.display());
            had_error = true;
        }
    }

    if had_error {
        std::process::exit(1);
    }
    Ok(())
}

fn touch_one(torrent_path: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(torrent_path)
        .with_context(|| format!("reading {}", torrent_path.display()))?;
    let torrent = Torrent::parse(&bytes).context("parsing torrent metainfo")?;

    let root = PathBuf::from(component_to_os_string(torrent.name()));
    for file in torrent.each_file() {
        if file.length != 0 {
            continue;
        }
        let path = if torrent.multifile() {
            let mut path = root.clone();
            for component in &file.path {
                path.push(component_to_os_string(component));
            }
            path
        } else {
            root.clone()
        };
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        tracing::info!(path = %path.display(), "created empty file");
    }
    Ok(())
}
