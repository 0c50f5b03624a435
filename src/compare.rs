//! Manifest vs. source consistency rules.
//!
//! Findings are collected in detection order: manifest order first, then
//! source order for the undeclared-function scan. Errors and warnings are
//! kept in separate lists so the report can group them.

use crate::EXPECTED_ENTRY_POINT;
use crate::manifest::{DeclaredFunction, Manifest};
use crate::signature::{ExtractedFunction, SignatureSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    FunctionNotImplemented,
    ParameterNotImplemented { parameter: String },
    ParameterDeclaredRequired { parameter: String },
    ParameterUndeclared { parameter: String },
    ReturnsMissing,
    ReturnsTypeMissing,
    ReturnsDescriptionMissing,
    ReturnsPropertiesMissing,
    PropertyTypeMissing { property: String },
    PropertyDescriptionMissing { property: String },
    DuplicateDeclaration { occurrence: usize },
    FunctionUndeclared,
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::FunctionNotImplemented
            | FindingKind::ParameterNotImplemented { .. }
            | FindingKind::ReturnsMissing
            | FindingKind::ReturnsTypeMissing
            | FindingKind::DuplicateDeclaration { .. } => Severity::Error,
            FindingKind::ParameterDeclaredRequired { .. }
            | FindingKind::ParameterUndeclared { .. }
            | FindingKind::ReturnsDescriptionMissing
            | FindingKind::ReturnsPropertiesMissing
            | FindingKind::PropertyTypeMissing { .. }
            | FindingKind::PropertyDescriptionMissing { .. }
            | FindingKind::FunctionUndeclared => Severity::Warning,
        }
    }

    /// Stable machine-readable identifier used in JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            FindingKind::FunctionNotImplemented => "function_not_implemented",
            FindingKind::ParameterNotImplemented { .. } => "parameter_not_implemented",
            FindingKind::ParameterDeclaredRequired { .. } => "parameter_declared_required",
            FindingKind::ParameterUndeclared { .. } => "parameter_undeclared",
            FindingKind::ReturnsMissing => "returns_missing",
            FindingKind::ReturnsTypeMissing => "returns_type_missing",
            FindingKind::ReturnsDescriptionMissing => "returns_description_missing",
            FindingKind::ReturnsPropertiesMissing => "returns_properties_missing",
            FindingKind::PropertyTypeMissing { .. } => "property_type_missing",
            FindingKind::PropertyDescriptionMissing { .. } => "property_description_missing",
            FindingKind::DuplicateDeclaration { .. } => "duplicate_declaration",
            FindingKind::FunctionUndeclared => "function_undeclared",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub function: String,
    pub kind: FindingKind,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = &self.function;
        match &self.kind {
            FindingKind::FunctionNotImplemented => write!(
                f,
                "function '{func}' is declared in the manifest but not defined in {EXPECTED_ENTRY_POINT}"
            ),
            FindingKind::ParameterNotImplemented { parameter } => write!(
                f,
                "function '{func}': parameter '{parameter}' is declared in the manifest but missing from the function signature"
            ),
            FindingKind::ParameterDeclaredRequired { parameter } => write!(
                f,
                "function '{func}': parameter '{parameter}' is declared required but has a default value in source"
            ),
            FindingKind::ParameterUndeclared { parameter } => write!(
                f,
                "function '{func}': parameter '{parameter}' is in the function signature but not declared in the manifest"
            ),
            FindingKind::ReturnsMissing => {
                write!(f, "function '{func}': missing 'returns' specification")
            }
            FindingKind::ReturnsTypeMissing => {
                write!(f, "function '{func}': returns is missing 'type'")
            }
            FindingKind::ReturnsDescriptionMissing => {
                write!(f, "function '{func}': returns is missing 'description'")
            }
            FindingKind::ReturnsPropertiesMissing => write!(
                f,
                "function '{func}': returns is an object; declare 'properties' to describe its fields"
            ),
            FindingKind::PropertyTypeMissing { property } => {
                write!(f, "function '{func}': returns.properties.{property} is missing 'type'")
            }
            FindingKind::PropertyDescriptionMissing { property } => write!(
                f,
                "function '{func}': returns.properties.{property} is missing 'description'"
            ),
            FindingKind::DuplicateDeclaration { occurrence } => write!(
                f,
                "function '{func}' is declared again in the manifest (occurrence {occurrence}); only the first declaration is checked"
            ),
            FindingKind::FunctionUndeclared => write!(
                f,
                "function '{func}' is defined in {EXPECTED_ENTRY_POINT} but not declared in the manifest"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl Findings {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    fn record(&mut self, function: &str, kind: FindingKind) {
        let finding = Finding {
            function: function.to_string(),
            kind,
        };
        match finding.severity() {
            Severity::Error => self.errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
        }
    }
}

/// Compare declared functions against the extracted signatures.
pub fn compare(manifest: &Manifest, signatures: &SignatureSet) -> Findings {
    let mut findings = Findings::default();
    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();

    for declared in &manifest.functions {
        let seen = occurrences.entry(declared.name.as_str()).or_insert(0);
        *seen += 1;
        if *seen > 1 {
            findings.record(
                &declared.name,
                FindingKind::DuplicateDeclaration { occurrence: *seen },
            );
            continue;
        }

        let Some(extracted) = signatures.get(&declared.name) else {
            findings.record(&declared.name, FindingKind::FunctionNotImplemented);
            continue;
        };
        check_parameters(declared, extracted, &mut findings);
        check_returns(declared, &mut findings);
    }

    let declared_names: BTreeSet<&str> = manifest.function_names().collect();
    for extracted in signatures.iter() {
        if extracted.is_public() && !declared_names.contains(extracted.name.as_str()) {
            findings.record(&extracted.name, FindingKind::FunctionUndeclared);
        }
    }

    debug!(
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "compared manifest against source"
    );
    findings
}

fn check_parameters(
    declared: &DeclaredFunction,
    extracted: &ExtractedFunction,
    findings: &mut Findings,
) {
    let name = declared.name.as_str();
    for param in &declared.parameters {
        match extracted.parameter(&param.name) {
            None => findings.record(
                name,
                FindingKind::ParameterNotImplemented {
                    parameter: param.name.clone(),
                },
            ),
            Some(actual) if param.required && !actual.required => findings.record(
                name,
                FindingKind::ParameterDeclaredRequired {
                    parameter: param.name.clone(),
                },
            ),
            Some(_) => {}
        }
    }

    for actual in &extracted.parameters {
        if !declared.parameters.iter().any(|p| p.name == actual.name) {
            findings.record(
                name,
                FindingKind::ParameterUndeclared {
                    parameter: actual.name.clone(),
                },
            );
        }
    }
}

fn check_returns(declared: &DeclaredFunction, findings: &mut Findings) {
    let name = declared.name.as_str();
    let Some(returns) = &declared.returns else {
        findings.record(name, FindingKind::ReturnsMissing);
        return;
    };

    if returns.kind.is_none() {
        findings.record(name, FindingKind::ReturnsTypeMissing);
    }
    if returns.description.is_none() {
        findings.record(name, FindingKind::ReturnsDescriptionMissing);
    }

    // Properties only describe object returns.
    if !returns.is_object() {
        return;
    }
    match &returns.properties {
        None => findings.record(name, FindingKind::ReturnsPropertiesMissing),
        Some(properties) => {
            for (property, spec) in properties {
                if spec.get("type").is_none() {
                    findings.record(
                        name,
                        FindingKind::PropertyTypeMissing {
                            property: property.clone(),
                        },
                    );
                }
                if spec.get("description").is_none() {
                    findings.record(
                        name,
                        FindingKind::PropertyDescriptionMissing {
                            property: property.clone(),
                        },
                    );
                }
            }
        }
    }
}
