//! Schema file reading at compile time.

use std::env;
use std::path::PathBuf;

use reportdb_schema::{Schema, SchemaError, validate_schema};

/// Read and validate a schema file, resolving the path relative to the
/// crate being compiled.
pub fn read_schema(path: &str) -> Result<Schema, SchemaReadError> {
    let full_path = resolve_schema_path(path)?;

    let content = std::fs::read_to_string(&full_path).map_err(|e| SchemaReadError::Io {
        path: full_path.display().to_string(),
        error: e.to_string(),
    })?;

    validate_schema(&content).map_err(|e| SchemaReadError::Validation {
        path: full_path.display().to_string(),
        errors: describe(&e),
    })
}

fn describe(error: &SchemaError) -> Vec<String> {
    error.flatten().iter().map(|e| e.to_string()).collect()
}

/// Resolve a schema path: `CARGO_MANIFEST_DIR` first, then absolute, then
/// the current directory.
fn resolve_schema_path(path: &str) -> Result<PathBuf, SchemaReadError> {
    let mut searched = Vec::new();

    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        let full_path = PathBuf::from(manifest_dir).join(path);
        if full_path.exists() {
            return Ok(full_path);
        }
        searched.push(full_path.display().to_string());
    }

    let absolute = PathBuf::from(path);
    if absolute.is_absolute() {
        if absolute.exists() {
            return Ok(absolute);
        }
        searched.push(absolute.display().to_string());
    }

    if let Ok(current_dir) = env::current_dir() {
        let relative_path = current_dir.join(path);
        if relative_path.exists() {
            return Ok(relative_path);
        }
        searched.push(relative_path.display().to_string());
    }

    Err(SchemaReadError::NotFound {
        path: path.to_string(),
        searched,
    })
}

/// Errors that can occur when reading a schema file.
#[derive(Debug)]
pub enum SchemaReadError {
    /// File not found.
    NotFound { path: String, searched: Vec<String> },
    /// IO error reading the file.
    Io { path: String, error: String },
    /// The schema failed to parse or validate.
    Validation { path: String, errors: Vec<String> },
}

impl std::fmt::Display for SchemaReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { path, searched } => {
                write!(
                    f,
                    "Schema file '{}' not found. Searched in:\n{}",
                    path,
                    searched
                        .iter()
                        .map(|s| format!("  - {}", s))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            }
            Self::Io { path, error } => {
                write!(f, "Failed to read schema file '{}': {}", path, error)
            }
            Self::Validation { path, errors } => {
                write!(f, "Schema '{}' is invalid:", path)?;
                for error in errors {
                    write!(f, "\n  - {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SchemaReadError {}
