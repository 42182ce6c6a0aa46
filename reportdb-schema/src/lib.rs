//! # reportdb-schema
//!
//! Schema parser and AST for reportdb.
//!
//! This crate provides:
//! - A parser for `.rdb` schema files (datasource, generator and model blocks)
//! - Configuration parsing for `reportdb.toml`
//! - Abstract Syntax Tree (AST) types for schema representation
//! - Semantic validation and relation resolution
//!
//! ## Example
//!
//! ```rust
//! use reportdb_schema::validate_schema;
//!
//! let schema = validate_schema(r#"
//!     model TezosWallet {
//!         id      String @id @default(uuid())
//!         address String @unique
//!     }
//! "#).unwrap();
//!
//! assert_eq!(schema.models.len(), 1);
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod parser;
pub mod validator;

pub use ast::*;
pub use config::ReportDbConfig;
pub use error::{SchemaError, SchemaResult};
pub use parser::{parse_schema, parse_schema_file};
pub use validator::{Validator, validate_schema};

/// Parse and validate a schema file.
pub fn validate_schema_file(path: impl AsRef<std::path::Path>) -> SchemaResult<Schema> {
    let schema = parse_schema_file(path)?;
    Validator::new().validate(schema)
}
