//! Error types for query operations.
//!
//! Every failure carries an [`ErrorCode`] compatible with the `P…` codes used
//! by Prisma-style clients, a message, and optional context describing the
//! model, operation, field and SQL involved.
//!
//! Errors are grouped into five [`ErrorKind`]s, mirroring the client error
//! classes callers usually branch on:
//!
//! | Kind | Codes |
//! |---|---|
//! | `KnownRequest` | P2002, P2003, P2011, P2025, P2028, P2034 |
//! | `UnknownRequest` | P2010, database errors without a known code |
//! | `RustPanic` | panics caught inside an engine future |
//! | `Initialization` | P1000, P1001, P1003, P1008, P1017 |
//! | `Validation` | P2009 |
//!
//! ```rust
//! use reportdb_query::{ErrorCode, ErrorKind, QueryError};
//!
//! let err = QueryError::not_found("User");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert_eq!(err.code.code(), "P2025");
//! assert_eq!(err.kind(), ErrorKind::KnownRequest);
//! assert!(err.to_string().contains("User"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Initialization (P1xxx)
    /// Authentication failed against the database server (P1000).
    AuthenticationFailed,
    /// Database server unreachable (P1001).
    DatabaseUnreachable,
    /// Database does not exist (P1003).
    DatabaseDoesNotExist,
    /// Operation timed out (P1008).
    OperationTimeout,
    /// Server closed the connection (P1017).
    ConnectionClosed,

    // Query engine (P2xxx)
    /// Unique constraint failed (P2002).
    UniqueConstraint,
    /// Foreign key constraint failed (P2003).
    ForeignKeyConstraint,
    /// Query arguments failed validation (P2009).
    InvalidQueryArguments,
    /// Raw query failed (P2010).
    RawQueryFailed,
    /// Null constraint violation (P2011).
    NullConstraint,
    /// Record required by the operation was not found (P2025).
    RecordNotFound,
    /// Interactive transaction API error (P2028).
    TransactionApi,
    /// Write conflict or deadlock (P2034).
    WriteConflict,

    /// Database error without a known code.
    Unknown,
    /// Panic caught inside the runtime.
    Panic,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P2025").
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "P1000",
            Self::DatabaseUnreachable => "P1001",
            Self::DatabaseDoesNotExist => "P1003",
            Self::OperationTimeout => "P1008",
            Self::ConnectionClosed => "P1017",
            Self::UniqueConstraint => "P2002",
            Self::ForeignKeyConstraint => "P2003",
            Self::InvalidQueryArguments => "P2009",
            Self::RawQueryFailed => "P2010",
            Self::NullConstraint => "P2011",
            Self::RecordNotFound => "P2025",
            Self::TransactionApi => "P2028",
            Self::WriteConflict => "P2034",
            Self::Unknown => "UNKNOWN",
            Self::Panic => "PANIC",
        }
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "Authentication failed",
            Self::DatabaseUnreachable => "Database server unreachable",
            Self::DatabaseDoesNotExist => "Database does not exist",
            Self::OperationTimeout => "Operation timed out",
            Self::ConnectionClosed => "Server closed the connection",
            Self::UniqueConstraint => "Unique constraint failed",
            Self::ForeignKeyConstraint => "Foreign key constraint failed",
            Self::InvalidQueryArguments => "Invalid query arguments",
            Self::RawQueryFailed => "Raw query failed",
            Self::NullConstraint => "Null constraint violation",
            Self::RecordNotFound => "Record not found",
            Self::TransactionApi => "Transaction API error",
            Self::WriteConflict => "Write conflict or deadlock",
            Self::Unknown => "Unknown database error",
            Self::Panic => "Panic in query engine",
        }
    }

    /// The client error class this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed
            | Self::DatabaseUnreachable
            | Self::DatabaseDoesNotExist
            | Self::OperationTimeout
            | Self::ConnectionClosed => ErrorKind::Initialization,
            Self::UniqueConstraint
            | Self::ForeignKeyConstraint
            | Self::NullConstraint
            | Self::RecordNotFound
            | Self::TransactionApi
            | Self::WriteConflict => ErrorKind::KnownRequest,
            Self::InvalidQueryArguments => ErrorKind::Validation,
            Self::RawQueryFailed | Self::Unknown => ErrorKind::UnknownRequest,
            Self::Panic => ErrorKind::RustPanic,
        }
    }

    /// Map a PostgreSQL SQLSTATE to an error code.
    ///
    /// Drivers call this when translating server errors so that constraint
    /// failures and conflicts surface with their known codes.
    pub fn from_sqlstate(state: &str) -> Self {
        match state {
            "23505" => Self::UniqueConstraint,
            "23503" => Self::ForeignKeyConstraint,
            "23502" => Self::NullConstraint,
            "40001" | "40P01" => Self::WriteConflict,
            "28000" | "28P01" => Self::AuthenticationFailed,
            "3D000" => Self::DatabaseDoesNotExist,
            "57P01" | "08006" => Self::ConnectionClosed,
            "08001" | "08004" => Self::DatabaseUnreachable,
            "57014" => Self::OperationTimeout,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The five client error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The database rejected the request with a known code.
    KnownRequest,
    /// The database rejected the request without a known code.
    UnknownRequest,
    /// A panic was caught while running the request.
    RustPanic,
    /// The client could not connect or lost its connection.
    Initialization,
    /// The request arguments were rejected before reaching the database.
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KnownRequest => "KnownRequestError",
            Self::UnknownRequest => "UnknownRequestError",
            Self::RustPanic => "RustPanicError",
            Self::Initialization => "InitializationError",
            Self::Validation => "ValidationError",
        };
        f.write_str(name)
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The SQL statement, if one was rendered.
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// The client error class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(
        mut self,
        text: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A record required by the operation does not exist.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(&model)
        .with_code_suggestion(
            "Use the non-throwing variant to get None instead of an error",
            format!(
                "client.{}().find_unique(..).exec().await",
                to_snake(&model)
            ),
        )
    }

    /// Unique constraint violation on the given fields.
    pub fn unique_violation(model: impl Into<String>, fields: impl Into<String>) -> Self {
        let model = model.into();
        let fields = fields.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint failed on {}({})", model, fields),
        )
        .with_model(&model)
        .with_field(&fields)
        .with_suggestion("Use upsert() to update the existing record instead")
    }

    /// Foreign key violation on the given field.
    pub fn foreign_key_violation(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::ForeignKeyConstraint,
            format!("Foreign key constraint failed on {}.{}", model, field),
        )
        .with_model(&model)
        .with_field(&field)
        .with_suggestion("Ensure the referenced record exists")
    }

    /// Null constraint violation on the given field.
    pub fn null_violation(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::NullConstraint,
            format!("Null constraint violation on {}.{}", model, field),
        )
        .with_model(&model)
        .with_field(&field)
    }

    /// Query arguments were rejected before any SQL was issued.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidQueryArguments, message)
    }

    /// A raw query failed on the server.
    pub fn raw_query_failed(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RawQueryFailed,
            format!("Raw query failed: {}", message.into()),
        )
        .with_sql(sql)
    }

    /// Interactive transaction API error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransactionApi,
            format!("Transaction API error: {}", message.into()),
        )
    }

    /// The transaction closure ran longer than its timeout.
    pub fn transaction_timeout(timeout_ms: u64) -> Self {
        Self::transaction(format!(
            "Transaction already closed: the timeout of {}ms was exceeded",
            timeout_ms
        ))
        .with_suggestion("Increase `timeout` in the transaction options")
    }

    /// A transaction could not be started within `max_wait`.
    pub fn transaction_start_timeout(max_wait_ms: u64) -> Self {
        Self::transaction(format!(
            "Unable to start a transaction in the given time ({}ms)",
            max_wait_ms
        ))
        .with_suggestion("Increase `max_wait` in the transaction options")
    }

    /// Write conflict or deadlock.
    pub fn write_conflict() -> Self {
        Self::new(
            ErrorCode::WriteConflict,
            "Transaction failed due to a write conflict or a deadlock",
        )
        .with_suggestion("Retry the transaction")
    }

    /// The database server cannot be reached.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DatabaseUnreachable,
            format!("Can't reach database server: {}", message.into()),
        )
        .with_suggestion("Check that the database server is running")
        .with_suggestion("Verify the connection URL is correct")
    }

    /// Authentication against the server failed.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AuthenticationFailed,
            format!("Authentication failed: {}", message.into()),
        )
        .with_suggestion("Check the credentials in the connection URL")
    }

    /// The operation timed out.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::OperationTimeout,
            format!("Operation timed out after {}ms", duration_ms),
        )
    }

    /// A panic was caught while driving an engine future.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Panic, message)
            .with_help("The query engine panicked; the connection may need to be re-established")
    }

    /// Database error without a known code.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// Database error classified from a SQLSTATE.
    pub fn from_sqlstate(state: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::from_sqlstate(state), message)
    }

    /// Row data could not be deserialized into the requested type.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Unknown,
            format!("Failed to deserialize result: {}", message.into()),
        )
        .with_suggestion("Check that the requested shape matches the selected columns")
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UniqueConstraint | ErrorCode::ForeignKeyConstraint | ErrorCode::NullConstraint
        )
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::OperationTimeout
            || (self.code == ErrorCode::TransactionApi && self.message.contains("timeout"))
    }

    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        self.kind() == ErrorKind::Initialization
    }

    /// Check if the caller may retry the operation.
    ///
    /// The runtime itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout() || self.code == ErrorCode::WriteConflict
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} [{}]: {}\n",
            self.kind(),
            self.code.code(),
            self.message
        ));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                let truncated: String = sql.chars().take(200).collect();
                format!("{}...", truncated)
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::deserialization(err.to_string()).with_source(err)
    }
}

fn to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
