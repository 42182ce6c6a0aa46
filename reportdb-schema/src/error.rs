//! Error types for schema parsing and validation.

// Fields read only by the derive macros trip this lint.
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur during schema parsing and validation.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(reportdb::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Syntax error in the schema file.
    #[error("syntax error: {message}")]
    #[diagnostic(code(reportdb::schema::syntax_error))]
    SyntaxError {
        #[source_code]
        src: String,
        #[label("error here")]
        span: miette::SourceSpan,
        message: String,
    },

    /// Invalid model definition.
    #[error("invalid model `{name}`: {message}")]
    #[diagnostic(code(reportdb::schema::invalid_model))]
    InvalidModel { name: String, message: String },

    /// Invalid field definition.
    #[error("invalid field `{model}.{field}`: {message}")]
    #[diagnostic(code(reportdb::schema::invalid_field))]
    InvalidField {
        model: String,
        field: String,
        message: String,
    },

    /// Invalid relation definition.
    #[error("invalid relation `{model}.{field}`: {message}")]
    #[diagnostic(code(reportdb::schema::invalid_relation))]
    InvalidRelation {
        model: String,
        field: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(reportdb::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Unknown type reference.
    #[error("unknown type `{type_name}` in `{model}.{field}`")]
    #[diagnostic(
        code(reportdb::schema::unknown_type),
        help("scalar types are String, Boolean, Int, BigInt, Float, DateTime and Json")
    )]
    UnknownType {
        model: String,
        field: String,
        type_name: String,
    },

    /// Invalid attribute.
    #[error("invalid attribute `@{attribute}` on `{target}`: {message}")]
    #[diagnostic(code(reportdb::schema::invalid_attribute))]
    InvalidAttribute {
        attribute: String,
        target: String,
        message: String,
    },

    /// The model has no way to identify a single record.
    #[error("model `{model}` has no unique identifier")]
    #[diagnostic(
        code(reportdb::schema::missing_identifier),
        help("add an `@id` field, an `@@id`, a `@unique` field or an `@@unique` set")
    )]
    MissingIdentifier { model: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(reportdb::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(reportdb::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// Validation error with multiple issues.
    #[error("schema validation failed with {count} error(s)")]
    #[diagnostic(code(reportdb::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create a syntax error with source location.
    pub fn syntax(
        src: impl Into<String>,
        offset: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::SyntaxError {
            src: src.into(),
            span: (offset, len).into(),
            message: message.into(),
        }
    }

    /// Create an invalid model error.
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            model: model.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid relation error.
    pub fn invalid_relation(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRelation {
            model: model.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid attribute error.
    pub fn invalid_attribute(
        attribute: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(
        model: impl Into<String>,
        field: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::UnknownType {
            model: model.into(),
            field: field.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Errors wrapped by `ValidationFailed`, or the error itself.
    pub fn flatten(&self) -> Vec<&SchemaError> {
        match self {
            Self::ValidationFailed { errors, .. } => errors.iter().collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
#[allow(unused_assignments)]
mod tests {
    use super::*;

    // ==================== Error Constructor Tests ====================

    #[test]
    fn test_syntax_error() {
        let err = SchemaError::syntax("model User { }", 6, 4, "unexpected token");

        match err {
            SchemaError::SyntaxError { src, span, message } => {
                assert_eq!(src, "model User { }");
                assert_eq!(span.offset(), 6);
                assert_eq!(span.len(), 4);
                assert_eq!(message, "unexpected token");
            }
            _ => panic!("Expected SyntaxError"),
        }
    }

    #[test]
    fn test_invalid_relation_error() {
        let err = SchemaError::invalid_relation("Tweet", "latestTweetsQuery", "length mismatch");

        match err {
            SchemaError::InvalidRelation {
                model,
                field,
                message,
            } => {
                assert_eq!(model, "Tweet");
                assert_eq!(field, "latestTweetsQuery");
                assert_eq!(message, "length mismatch");
            }
            _ => panic!("Expected InvalidRelation"),
        }
    }

    // ==================== Error Display Tests ====================

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SchemaError::IoError {
            path: "schema.rdb".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("schema.rdb"));
    }

    #[test]
    fn test_syntax_error_display_includes_message() {
        let err = SchemaError::syntax("model", 0, 5, "expected identifier");
        assert_eq!(err.to_string(), "syntax error: expected identifier");
    }

    #[test]
    fn test_field_errors_display() {
        assert!(
            SchemaError::invalid_field("User", "email", "test")
                .to_string()
                .contains("User.email")
        );
        let unknown = SchemaError::unknown_type("Post", "author", "Author");
        assert!(unknown.to_string().contains("Author"));
        assert!(unknown.to_string().contains("Post.author"));
    }

    #[test]
    fn test_attribute_error_display() {
        let err = SchemaError::invalid_attribute("updatedAt", "Post.name", "requires DateTime");
        assert_eq!(
            err.to_string(),
            "invalid attribute `@updatedAt` on `Post.name`: requires DateTime"
        );
    }

    #[test]
    fn test_duplicate_and_identifier_display() {
        let err = SchemaError::duplicate("model", "User");
        assert_eq!(err.to_string(), "duplicate model `User`");

        let err = SchemaError::MissingIdentifier {
            model: "Loose".to_string(),
        };
        assert!(err.to_string().contains("Loose"));
    }

    #[test]
    fn test_validation_failed_flatten() {
        let err = SchemaError::ValidationFailed {
            count: 2,
            errors: vec![
                SchemaError::duplicate("model", "User"),
                SchemaError::config("bad"),
            ],
        };
        assert!(err.to_string().contains('2'));
        assert_eq!(err.flatten().len(), 2);
        assert_eq!(SchemaError::config("x").flatten().len(), 1);
    }

    // ==================== Diagnostic Tests ====================

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic;

        let err = SchemaError::duplicate("model", "User");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("reportdb::schema::duplicate"));

        let err = SchemaError::MissingIdentifier {
            model: "X".to_string(),
        };
        assert!(err.help().is_some());
    }
}
