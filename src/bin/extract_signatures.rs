//! Print the top-level function signatures of a prefab entry point as JSON.
//!
//! Usage:
//!   extract-signatures
//!   extract-signatures --file path/to/main.py

use anyhow::{Context, Result};
use clap::Parser;
use prefabcheck::{ProjectLayout, extract_signatures, find_project_root};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "extract-signatures")]
#[command(about = "Dump the functions a prefab entry point exposes")]
struct Cli {
    /// Python source to inspect; defaults to <root>/src/main.py.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Project root used when --file is omitted.
    #[arg(long)]
    root: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let path = match cli.file {
        Some(file) => file,
        None => {
            let root =
                find_project_root(cli.root.as_deref()).context("locating prefab project root")?;
            ProjectLayout::new(root).entry_point
        }
    };

    let signatures = extract_signatures(&path)?;
    println!("{}", serde_json::to_string_pretty(signatures.functions())?);
    Ok(())
}
