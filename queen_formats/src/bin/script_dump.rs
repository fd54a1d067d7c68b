use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use queen_formats::{CutawayScript, DialogueTree, LogicFile};

/// Parse a cutscene, dialogue or logic file and print it as JSON.
#[derive(Parser)]
struct Args {
    /// Path to a `.cut`, `.dog` or `.jas` file
    path: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes = fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let extension = args
        .path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let json = match extension.as_str() {
        "cut" => serde_json::to_string_pretty(&CutawayScript::parse(&bytes)?)?,
        "dog" => serde_json::to_string_pretty(&DialogueTree::parse(&bytes)?)?,
        "jas" => serde_json::to_string_pretty(&LogicFile::parse(&bytes)?)?,
        other => bail!("don't know how to dump a .{other} file"),
    };
    println!("{json}");
    Ok(())
}
