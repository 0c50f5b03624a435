//! Prefab manifest wiring.
//!
//! This module wraps the declared function catalog on disk
//! (`prefab-manifest.json`) so the checker can load it, enforce the
//! top-level contract, and hand a typed snapshot to the comparator. Types in
//! `model` mirror the manifest fields; `schema` owns the fail-fast checks that
//! run before any source is parsed.

pub mod model;
pub mod schema;

pub use model::{DeclaredFunction, DeclaredParameter, Manifest, ReturnSpec, load_manifest};
pub use schema::{SchemaViolation, validate_schema};
