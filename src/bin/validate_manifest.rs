//! Check prefab-manifest.json against the functions defined in src/main.py.
//!
//! Usage:
//!   validate-manifest
//!   validate-manifest --root path/to/prefab
//!   validate-manifest --format json > report.json
//!
//! Exit status is 0 when the manifest and source are consistent (warnings
//! allowed) and 1 on any error or aborted stage.

use anyhow::{Context, Result};
use clap::Parser;
use prefabcheck::{OutputFormat, ProjectLayout, check_project, find_project_root, render};
use std::io::{Write, stdout};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "validate-manifest")]
#[command(about = "Validate a prefab manifest against its entry point")]
struct Cli {
    /// Project root; defaults to PREFAB_ROOT or the nearest directory holding the manifest.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Manifest path relative to the root.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Emit debug logs on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = find_project_root(cli.root.as_deref()).context("locating prefab project root")?;
    let mut layout = ProjectLayout::new(root);
    if let Some(manifest) = &cli.manifest {
        layout = layout.with_manifest(manifest);
    }

    let outcome = check_project(&layout);
    let mut out = stdout().lock();
    render(&mut out, cli.format, &layout, &outcome).context("writing report")?;
    out.flush().context("flushing report")?;
    Ok(outcome.exit_code())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
