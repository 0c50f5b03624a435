//! Consistency checker for prefab manifests.
//!
//! A prefab exposes the top-level functions of `src/main.py` to an
//! orchestration gateway and declares them in `prefab-manifest.json`. The
//! pipeline here loads the manifest, enforces its top-level contract, extracts
//! the real signatures from the entry point and diffs the two.

pub mod compare;
pub mod error;
pub mod manifest;
pub mod report;
pub mod signature;

pub use compare::{Finding, FindingKind, Findings, Severity, compare};
pub use error::CheckError;
pub use manifest::{Manifest, SchemaViolation, load_manifest, validate_schema};
pub use report::{OutputFormat, render};
pub use signature::{ExtractedFunction, ExtractedParameter, SignatureSet, extract_signatures};

use anyhow::{Result, bail};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Manifest file name, relative to the project root.
pub const MANIFEST_FILE: &str = "prefab-manifest.json";
/// The gateway always invokes this entry point.
pub const EXPECTED_ENTRY_POINT: &str = "src/main.py";
pub const EXPECTED_DEPENDENCIES_FILE: &str = "pyproject.toml";

const ENV_PROJECT_ROOT: &str = "PREFAB_ROOT";

/// Paths the checker reads, resolved against a project root.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub entry_point: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            manifest: root.join(MANIFEST_FILE),
            entry_point: root.join(EXPECTED_ENTRY_POINT),
            root,
        }
    }

    /// Override the manifest location; relative paths resolve against the root.
    pub fn with_manifest(mut self, manifest: &Path) -> Self {
        self.manifest = if manifest.is_absolute() {
            manifest.to_path_buf()
        } else {
            self.root.join(manifest)
        };
        self
    }

    /// Path for display, relative to the root when possible.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }
}

/// Result of one checker run.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The manifest could not be read or parsed.
    LoadFailed(CheckError),
    SchemaInvalid(Vec<SchemaViolation>),
    /// The entry point could not be read or parsed.
    ExtractFailed(CheckError),
    Compared {
        function_count: usize,
        findings: Findings,
    },
}

impl CheckOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckOutcome::Compared { findings, .. } if !findings.has_errors() => 0,
            _ => 1,
        }
    }
}

/// Run load, schema check, extraction and comparison for one project.
///
/// Stops at the first fatal stage; the returned outcome says which.
pub fn check_project(layout: &ProjectLayout) -> CheckOutcome {
    let raw = match load_manifest(&layout.manifest) {
        Ok(raw) => raw,
        Err(err) => return CheckOutcome::LoadFailed(err),
    };

    let violations = validate_schema(&raw);
    if !violations.is_empty() {
        return CheckOutcome::SchemaInvalid(violations);
    }
    let manifest = match Manifest::from_value(raw) {
        Ok(manifest) => manifest,
        Err(err) => {
            return CheckOutcome::SchemaInvalid(vec![SchemaViolation::Contract {
                pointer: String::new(),
                message: err.to_string(),
            }]);
        }
    };
    debug!(
        id = %manifest.id,
        functions = manifest.functions.len(),
        "manifest accepted"
    );

    let signatures = match extract_signatures(&layout.entry_point) {
        Ok(signatures) => signatures,
        Err(err) => return CheckOutcome::ExtractFailed(err),
    };

    CheckOutcome::Compared {
        function_count: signatures.len(),
        findings: compare(&manifest, &signatures),
    }
}

fn is_project_root(candidate: &Path) -> bool {
    candidate.join(MANIFEST_FILE).is_file()
}

fn project_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !hint_path.is_dir() {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_project_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the prefab project root.
///
/// Order: the explicit path, `PREFAB_ROOT`, the nearest ancestor of the
/// current directory holding a manifest, then the current directory itself
/// (so a missing manifest is reported by the loader rather than here).
pub fn find_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_dir() {
            bail!("project root {} is not a directory", path.display());
        }
        return Ok(path.to_path_buf());
    }

    if let Ok(env_root) = env::var(ENV_PROJECT_ROOT) {
        if let Some(root) = project_root_from_hint(&env_root) {
            return Ok(root);
        }
        debug!(value = %env_root, "ignoring {ENV_PROJECT_ROOT}: not a directory");
    }

    let cwd = env::current_dir()?;
    Ok(search_upwards(&cwd).unwrap_or(cwd))
}
