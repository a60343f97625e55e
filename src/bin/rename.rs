//! `bencode-rename`, renames torrent files to `<info.name>.torrent`.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use bencode_tools::torrent::{component_to_os_string, Torrent};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rename torrent files to <info.name>.torrent")]
struct Args {
    /// Torrent files to rename in place.
    torrents: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut had_error = false;

    for torrent_path in &args.torrents {
        if let Err(e) = rename_one(torrent_path) {
            eprintln!("{}: {e:#}", torrent_path.display());
            had_error = true;
        }
    }

    if had_error {
        std::process::exit(1);
    }
    Ok(())
}

fn rename_one(torrent_path: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(torrent_path)
        .with_context(|| format!("reading {}", torrent_path.display()))?;
    let torrent = Torrent::parse(&bytes).context("parsing torrent metainfo")?;

    let dir = torrent_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."));
    let mut target_name = component_to_os_string(torrent.name());
    target_name.push(".torrent");
    let target = dir.join(target_name);

    if target.exists() && target != *torrent_path {
        bail!("refusing to overwrite existing file {}", target.display());
    }

    std::fs::rename(torrent_path, &target)
        .with_context(|| format!("renaming to {}", target.display()))?;
    tracing::info!(from = %torrent_path.display(), to = %target.display(), "renamed torrent");
    Ok(())
}
