//! `bencode-verify`, checks a content tree against a torrent's piece
//! hashes.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use bencode_tools::torrent::{component_to_os_string, Torrent};
use bencode_tools::verify::{self, VerifyOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Verify a torrent's content against its piece hashes")]
struct Args {
    /// Path to the .torrent metainfo file.
    torrent: PathBuf,

    /// Content root to verify. Defaults to the torrent's declared name
    /// resolved against the current directory (or the torrent's own
    /// directory, with --here).
    checkee: Option<PathBuf>,

    /// Suppress per-piece progress output.
    #[arg(long)]
    quiet: bool,

    /// Stop at the first piece that reports any error.
    #[arg(long)]
    fail_fast: bool,

    /// Resolve `checkee` relative to the torrent's own directory
    /// instead of the current directory.
    #[arg(long)]
    here: bool,

    /// Write every successfully verified piece's bytes into this
    /// directory, named by piece index.
    #[arg(long)]
    extract: Option<PathBuf>,

    /// Emit terminal-title escape sequences showing verification
    /// progress.
    #[arg(long)]
    title_progress: bool,
}

fn emit_title_progress(index: u64, count: u64) {
    print!("\x1b]2;verifying piece {index}/{count}\x07");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let bytes = std::fs::read(&args.torrent)
        .with_context(|| format!("reading {}", args.torrent.display()))?;
    let torrent = Torrent::parse(&bytes).context("parsing torrent metainfo")?;

    let content_root = match &args.checkee {
        Some(checkee) if args.here => args
            .torrent
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(checkee),
        Some(checkee) => checkee.clone(),
        None if args.here => args
            .torrent
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(component_to_os_string(torrent.name())),
        None => PathBuf::from(component_to_os_string(torrent.name())),
    };

    let options = VerifyOptions {
        fail_fast: args.fail_fast,
        extract_dir: args.extract.clone(),
    };

    let summary = verify::verify(&torrent, &content_root, &options)?;

    if !args.quiet {
        for report in &summary.reports {
            if args.title_progress {
                emit_title_progress(report.index + 1, summary.piece_count);
            }
            let descriptor = report
                .fragments
                .iter()
                .map(|f| {
                    let path = f
                        .path
                        .iter()
                        .map(|c| String::from_utf8_lossy(c).into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    if f.covers_whole_file() {
                        path
                    } else if f.range.start == 0 {
                        format!("{path}...")
                    } else if f.range.end == f.file_length {
                        format!("...{path}")
                    } else {
                        format!("...{path}...")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "piece {}/{}: {:?} [{}]",
                report.index + 1,
                summary.piece_count,
                report.status,
                descriptor
            );
        }
        if !summary.extra_files.is_empty() {
            println!("extra files:");
            for path in &summary.extra_files {
                println!("  {}", path.display());
            }
        }
        println!(
            "{}/{} pieces valid",
            summary.valid_pieces, summary.piece_count
        );
    }

    std::process::exit(summary.exit_code());
}
