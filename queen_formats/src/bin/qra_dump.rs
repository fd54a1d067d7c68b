use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use queen_formats::ResourceArchive;

/// List the entries of a QRES resource archive, optionally extracting them.
#[derive(Parser)]
struct Args {
    /// Path to the `.qra` archive
    path: PathBuf,

    /// Directory to extract every entry into
    #[arg(long)]
    extract: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let archive = ResourceArchive::open(&args.path)?;
    println!(
        "{} entries in {}",
        archive.entries().len(),
        archive.path().display()
    );
    for entry in archive.entries() {
        println!(
            "{name:<12} {offset:>10} {size:>10}",
            name = entry.name,
            offset = entry.offset,
            size = entry.size
        );
    }

    if let Some(dest) = args.extract.as_ref() {
        std::fs::create_dir_all(dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        for entry in archive.entries() {
            archive.extract_entry(entry, dest.join(&entry.name))?;
        }
        println!("extracted to {}", dest.display());
    }
    Ok(())
}
