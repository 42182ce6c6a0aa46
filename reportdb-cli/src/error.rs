//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

use reportdb_schema::SchemaError;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(reportdb::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(reportdb::config))]
    Config(String),

    /// Schema parse or validation error, with its source diagnostics
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    /// Format check failed
    #[error("Format error: {0}")]
    #[diagnostic(code(reportdb::format), help("run `reportdb format` to fix formatting"))]
    Format(String),

    /// Code generation error
    #[error("Codegen error: {0}")]
    #[diagnostic(code(reportdb::codegen))]
    Codegen(String),
}
