use crate::error::CheckError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Typed view of a manifest that already passed [`crate::manifest::validate_schema`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Opaque identity fields: presence is checked, contents are not.
    pub schema_version: Value,
    pub id: Value,
    pub version: Value,
    pub entry_point: String,
    pub dependencies_file: String,
    pub functions: Vec<DeclaredFunction>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeclaredFunction {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<DeclaredParameter>,
    #[serde(default)]
    pub returns: Option<ReturnSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeclaredParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReturnSpec {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Property name to `{type, description}`; key order follows the file.
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl ReturnSpec {
    pub fn is_object(&self) -> bool {
        self.kind.as_deref() == Some("object")
    }
}

impl Manifest {
    /// Convert a schema-checked JSON document into the typed model.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|func| func.name.as_str())
    }
}

/// Read and parse the manifest as untyped JSON.
///
/// The document stays untyped here so the schema check can name every
/// missing field instead of stopping at the first serde error.
pub fn load_manifest(path: &Path) -> Result<Value, CheckError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(CheckError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(CheckError::io(path, err)),
    };

    let value: Value = serde_json::from_str(&data).map_err(|err| CheckError::ManifestParse {
        path: path.to_path_buf(),
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
    })?;
    debug!(path = %path.display(), "loaded manifest");
    Ok(value)
}
