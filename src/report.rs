//! Human and JSON rendering of a checker run.
//!
//! Text output groups warnings before errors and ends with a verdict line.
//! JSON output carries the same findings plus stable codes. Neither format
//! changes the exit code, which always comes from [`CheckOutcome::exit_code`].

use crate::compare::Finding;
use crate::error::CheckError;
use crate::{CheckOutcome, EXPECTED_ENTRY_POINT, ProjectLayout};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Write the report for `outcome` in the requested format.
pub fn render(
    out: &mut impl Write,
    format: OutputFormat,
    layout: &ProjectLayout,
    outcome: &CheckOutcome,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => render_text(out, layout, outcome),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &JsonReport::new(layout, outcome))?;
            writeln!(out)
        }
    }
}

pub fn render_text(
    out: &mut impl Write,
    layout: &ProjectLayout,
    outcome: &CheckOutcome,
) -> io::Result<()> {
    let manifest = layout.relative(&layout.manifest);
    writeln!(out, "Checking {manifest} against {EXPECTED_ENTRY_POINT}")?;
    writeln!(out)?;

    let (function_count, findings) = match outcome {
        CheckOutcome::LoadFailed(err) => return writeln!(out, "[error] {err}"),
        CheckOutcome::SchemaInvalid(violations) => {
            for violation in violations {
                writeln!(out, "[error] {violation}")?;
            }
            return Ok(());
        }
        CheckOutcome::ExtractFailed(err) => {
            writeln!(out, "[ok] manifest schema is valid")?;
            return writeln!(out, "[error] {err}");
        }
        CheckOutcome::Compared {
            function_count,
            findings,
        } => (function_count, findings),
    };

    writeln!(out, "[ok] manifest schema is valid")?;
    writeln!(
        out,
        "[ok] parsed {EXPECTED_ENTRY_POINT} and found {function_count} {}",
        if *function_count == 1 { "function" } else { "functions" }
    )?;

    if !findings.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in &findings.warnings {
            writeln!(out, "  [warn] {warning}")?;
        }
    }

    if findings.has_errors() {
        writeln!(out)?;
        writeln!(out, "Errors:")?;
        for error in &findings.errors {
            writeln!(out, "  [error] {error}")?;
        }
        writeln!(out)?;
        return writeln!(out, "Validation failed: fix the errors above.");
    }

    writeln!(out)?;
    writeln!(
        out,
        "Validation passed: manifest and {EXPECTED_ENTRY_POINT} are fully consistent."
    )
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Passed,
    Failed,
    Aborted,
}

#[derive(Serialize)]
struct JsonEntry {
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    message: String,
}

impl From<&Finding> for JsonEntry {
    fn from(finding: &Finding) -> Self {
        Self {
            code: finding.kind.code(),
            function: Some(finding.function.clone()),
            message: finding.to_string(),
        }
    }
}

impl From<&CheckError> for JsonEntry {
    fn from(err: &CheckError) -> Self {
        let code = match err {
            CheckError::ManifestNotFound { .. } => "manifest_not_found",
            CheckError::ManifestParse { .. } => "manifest_parse_error",
            CheckError::EntryPointNotFound { .. } => "entry_point_not_found",
            CheckError::EntryPointSyntax { .. } => "entry_point_syntax_error",
            CheckError::Parser(_) => "parser_error",
            CheckError::Io { .. } => "io_error",
        };
        Self {
            code,
            function: None,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport {
    status: Status,
    manifest: String,
    entry_point: &'static str,
    function_count: Option<usize>,
    warnings: Vec<JsonEntry>,
    errors: Vec<JsonEntry>,
}

impl JsonReport {
    fn new(layout: &ProjectLayout, outcome: &CheckOutcome) -> Self {
        let mut report = JsonReport {
            status: Status::Aborted,
            manifest: layout.relative(&layout.manifest),
            entry_point: EXPECTED_ENTRY_POINT,
            function_count: None,
            warnings: Vec::new(),
            errors: Vec::new(),
        };
        match outcome {
            CheckOutcome::LoadFailed(err) | CheckOutcome::ExtractFailed(err) => {
                report.errors.push(err.into());
            }
            CheckOutcome::SchemaInvalid(violations) => {
                report.errors = violations
                    .iter()
                    .map(|violation| JsonEntry {
                        code: "schema_invalid",
                        function: None,
                        message: violation.to_string(),
                    })
                    .collect();
            }
            CheckOutcome::Compared {
                function_count,
                findings,
            } => {
                report.status = if findings.has_errors() {
                    Status::Failed
                } else {
                    Status::Passed
                };
                report.function_count = Some(*function_count);
                report.warnings = findings.warnings.iter().map(JsonEntry::from).collect();
                report.errors = findings.errors.iter().map(JsonEntry::from).collect();
            }
        }
        report
    }
}
