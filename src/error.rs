//! Failure taxonomy for the checker pipeline.
//!
//! Every variant aborts the run; consistency findings are not errors in this
//! sense and live in [`crate::compare::Findings`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{} does not exist", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("{} is not valid JSON (line {line}, column {column}): {message}", path.display())]
    ManifestParse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{} does not exist", path.display())]
    EntryPointNotFound { path: PathBuf },

    #[error("{} has a syntax error (line {line}, column {column}): {message}", path.display())]
    EntryPointSyntax {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("loading the Python grammar failed: {0}")]
    Parser(String),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckError::Io {
            path: path.into(),
            source,
        }
    }
}
