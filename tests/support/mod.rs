#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/prefab")
}

pub fn validator_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_validate-manifest"))
}

pub fn extractor_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_extract-signatures"))
}

/// Runs `cmd` and returns its output, failing on a non-zero exit.
pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute {:?}", cmd.get_program()))?;
    if !output.status.success() {
        bail!(
            "command {:?} exited with {:?}\nstdout:\n{}\nstderr:\n{}",
            cmd.get_program(),
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

/// Runs `cmd` without judging its exit status.
pub fn run_unchecked(mut cmd: Command) -> Result<Output> {
    cmd.env_remove("PREFAB_ROOT")
        .env_remove("RUST_LOG")
        .output()
        .with_context(|| format!("failed to execute {:?}", cmd.get_program()))
}

/// Scratch prefab project: a manifest plus `src/main.py` under a temp dir.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("allocating temp project")?;
        fs::create_dir_all(dir.path().join("src"))?;
        Ok(Self { dir })
    }

    pub fn with(manifest: &Value, source: &str) -> Result<Self> {
        let project = Self::new()?;
        project.write_manifest(manifest)?;
        project.write_source(source)?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_manifest(&self, manifest: &Value) -> Result<()> {
        self.write_manifest_raw(&serde_json::to_string_pretty(manifest)?)
    }

    pub fn write_manifest_raw(&self, contents: &str) -> Result<()> {
        fs::write(self.root().join("prefab-manifest.json"), contents)
            .context("writing manifest fixture")
    }

    pub fn write_source(&self, source: &str) -> Result<()> {
        fs::write(self.root().join("src/main.py"), source).context("writing main.py fixture")
    }

    pub fn validate(&self, extra: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(validator_binary());
        cmd.arg("--root").arg(self.root()).args(extra);
        run_unchecked(cmd)
    }
}

/// Manifest skeleton with valid top-level fields around `functions`.
pub fn manifest_with(functions: Value) -> Value {
    json!({
        "schema_version": "1.0",
        "id": "test-prefab",
        "version": "0.1.0",
        "name": "Test prefab",
        "entry_point": "src/main.py",
        "dependencies_file": "pyproject.toml",
        "functions": functions
    })
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
