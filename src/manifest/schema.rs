//! Fail-fast structural checks for the manifest.
//!
//! The required top-level fields and the two protocol constants are checked
//! by hand so each violation names the field involved. Once those hold, the
//! bundled JSON Schema contract checks the shape of `functions` entries.

use crate::{EXPECTED_DEPENDENCIES_FILE, EXPECTED_ENTRY_POINT};
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// Top-level fields every manifest must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "schema_version",
    "id",
    "version",
    "entry_point",
    "dependencies_file",
    "functions",
];

const CONTRACT_SOURCE: &str = include_str!("../../schema/prefab_manifest.schema.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaViolation {
    NotAnObject,
    MissingField {
        field: &'static str,
    },
    UnexpectedValue {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },
    Contract {
        pointer: String,
        message: String,
    },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::NotAnObject => write!(f, "manifest must be a JSON object"),
            SchemaViolation::MissingField { field } => {
                write!(f, "manifest is missing required field: {field}")
            }
            SchemaViolation::UnexpectedValue {
                field,
                expected,
                actual,
            } => write!(f, "{field} must be '{expected}', found: {actual}"),
            SchemaViolation::Contract { pointer, message } if pointer.is_empty() => {
                write!(f, "manifest: {message}")
            }
            SchemaViolation::Contract { pointer, message } => {
                write!(f, "manifest{pointer}: {message}")
            }
        }
    }
}

/// Check the manifest against the top-level contract.
///
/// Returns every violation found; an empty list means the manifest may be
/// converted with [`crate::manifest::Manifest::from_value`]. Contract
/// (shape) checks only run once the required fields and constants hold.
pub fn validate_schema(manifest: &Value) -> Vec<SchemaViolation> {
    let Some(object) = manifest.as_object() else {
        return vec![SchemaViolation::NotAnObject];
    };

    let mut violations: Vec<SchemaViolation> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| SchemaViolation::MissingField { field: *field })
        .collect();

    for (field, expected) in [
        ("entry_point", EXPECTED_ENTRY_POINT),
        ("dependencies_file", EXPECTED_DEPENDENCIES_FILE),
    ] {
        if let Some(actual) = object.get(field) {
            if actual.as_str() != Some(expected) {
                violations.push(SchemaViolation::UnexpectedValue {
                    field,
                    expected,
                    actual: display_value(actual),
                });
            }
        }
    }

    if violations.is_empty() {
        violations.extend(contract_violations(manifest));
    }
    debug!(violations = violations.len(), "manifest schema checked");
    violations
}

fn contract_violations(manifest: &Value) -> Vec<SchemaViolation> {
    let schema = match contract() {
        Ok(schema) => schema,
        Err(message) => {
            return vec![SchemaViolation::Contract {
                pointer: String::new(),
                message,
            }];
        }
    };

    match schema.validate(manifest) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|err| SchemaViolation::Contract {
                pointer: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect(),
    }
}

fn contract() -> Result<JSONSchema, String> {
    static RAW: OnceLock<Result<Value, String>> = OnceLock::new();
    let raw = RAW
        .get_or_init(|| serde_json::from_str(CONTRACT_SOURCE).map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|err| format!("bundled manifest contract is not valid JSON: {err}"))?;
    JSONSchema::compile(raw)
        .map_err(|err| format!("bundled manifest contract failed to compile: {err}"))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => format!("'{text}'"),
        other => other.to_string(),
    }
}
