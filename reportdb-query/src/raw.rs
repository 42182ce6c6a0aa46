//! Raw SQL with parameter binding.
//!
//! [`Sql`] builds a statement piece by piece; every bound value becomes a
//! `$n` placeholder and is never spliced into the SQL text.
//!
//! ```rust
//! use reportdb_query::Sql;
//!
//! let sql = Sql::new("SELECT * FROM \"Tweet\" WHERE \"likeCount\" > ")
//!     .bind(10)
//!     .push(" AND \"twitterUserId\" = ")
//!     .bind("42");
//! assert_eq!(
//!     sql.sql(),
//!     "SELECT * FROM \"Tweet\" WHERE \"likeCount\" > $1 AND \"twitterUserId\" = $2"
//! );
//! assert_eq!(sql.params().len(), 2);
//! ```
//!
//! # The raw_query! macro
//!
//! `{}` markers are replaced with placeholders, in order:
//!
//! ```rust
//! use reportdb_query::raw_query;
//!
//! let handle = "'; DROP TABLE \"TwitterUser\"; --";
//! let sql = raw_query!("SELECT * FROM \"TwitterUser\" WHERE \"handle\" = {}", handle);
//! assert_eq!(sql.sql(), "SELECT * FROM \"TwitterUser\" WHERE \"handle\" = $1");
//! assert!(!sql.sql().contains("DROP TABLE"));
//! ```
//!
//! Failures of raw statements without a more specific code are reported as
//! `P2010`.

use std::fmt;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::sql::Statement;
use crate::traits::{QueryEngine, Row};

/// A raw SQL statement with bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    sql: String,
    params: Vec<FilterValue>,
}

impl Sql {
    /// Start from a literal SQL string.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append literal SQL.
    pub fn push(mut self, sql: impl AsRef<str>) -> Self {
        self.sql.push_str(sql.as_ref());
        self
    }

    /// Bind a value at the current position.
    pub fn bind(mut self, value: impl Into<FilterValue>) -> Self {
        self.params.push(value.into());
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self
    }

    /// Bind several values as a comma-separated list.
    pub fn bind_list(mut self, values: impl IntoIterator<Item = impl Into<FilterValue>>) -> Self {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self = self.bind(value);
        }
        self
    }

    /// Append literal SQL only when `condition` holds.
    pub fn push_if(self, condition: bool, sql: impl AsRef<str>) -> Self {
        if condition { self.push(sql) } else { self }
    }

    /// Append SQL followed by a bound value.
    pub fn push_bind(self, sql: impl AsRef<str>, value: impl Into<FilterValue>) -> Self {
        self.push(sql).bind(value)
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound values.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }

    /// Whether there is no SQL text.
    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl From<Sql> for Statement {
    fn from(sql: Sql) -> Self {
        Statement::new(sql.sql, sql.params)
    }
}

/// Report a raw statement failure as `P2010` unless the database gave a
/// more specific code.
pub(crate) fn raw_error(err: QueryError, sql: &str) -> QueryError {
    if err.code == ErrorCode::Unknown {
        QueryError::raw_query_failed(err.message, sql)
    } else {
        err.with_sql(sql)
    }
}

/// Run a raw statement that returns rows.
pub(crate) async fn query_raw<E: QueryEngine>(engine: &E, statement: Statement) -> QueryResult<Vec<Row>> {
    let Statement { sql, params } = statement;
    if sql.trim().is_empty() {
        return Err(QueryError::validation("raw query is empty"));
    }
    debug!(sql = %sql, params = params.len(), "Running raw query");
    engine.query(&sql, params).await.map_err(|e| raw_error(e, &sql))
}

/// Run a raw statement that returns rows and decode them into `T`.
pub(crate) async fn query_raw_as<E: QueryEngine, T: DeserializeOwned>(
    engine: &E,
    statement: Statement,
) -> QueryResult<Vec<T>> {
    crate::operations::decode_all(query_raw(engine, statement).await?)
}

/// Run a raw statement and return the number of affected rows.
pub(crate) async fn execute_raw<E: QueryEngine>(engine: &E, statement: Statement) -> QueryResult<u64> {
    let Statement { sql, params } = statement;
    if sql.trim().is_empty() {
        return Err(QueryError::validation("raw statement is empty"));
    }
    debug!(sql = %sql, params = params.len(), "Running raw statement");
    engine.execute(&sql, params).await.map_err(|e| raw_error(e, &sql))
}

/// Build a [`Sql`] from a format string whose `{}` markers become bound
/// parameters.
///
/// ```rust,ignore
/// let rows = client
///     .query_raw(raw_query!("SELECT * FROM \"Report\" WHERE \"walletId\" = {}", wallet_id))
///     .await?;
/// ```
#[macro_export]
macro_rules! raw_query {
    ($sql:expr) => {
        $crate::raw::Sql::new($sql)
    };

    ($sql:expr, $($params:expr),+ $(,)?) => {{
        let params: Vec<$crate::filter::FilterValue> = vec![$($params.into()),+];
        let parts: Vec<&str> = $sql.split("{}").collect();
        let mut params = params.into_iter();
        let mut sql = $crate::raw::Sql::default();
        for (i, part) in parts.iter().enumerate() {
            sql = sql.push(part);
            if i + 1 < parts.len() {
                if let Some(param) = params.next() {
                    sql = sql.bind(param);
                }
            }
        }
        sql
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::error::ErrorKind;
    use crate::testing::MockEngine;

    // ==========================================================================
    // Sql
    // ==========================================================================

    #[test]
    fn test_sql_bind() {
        let sql = Sql::new("SELECT * FROM \"Post\" WHERE \"id\" = ").bind(42);
        assert_eq!(sql.sql(), "SELECT * FROM \"Post\" WHERE \"id\" = $1");
        assert_eq!(sql.params(), &[FilterValue::Int(42)]);
    }

    #[test]
    fn test_sql_bind_list() {
        let sql = Sql::new("SELECT * FROM \"Post\" WHERE \"id\" IN (")
            .bind_list([1, 2, 3])
            .push(")");
        assert_eq!(sql.sql(), "SELECT * FROM \"Post\" WHERE \"id\" IN ($1, $2, $3)");
        assert_eq!(sql.params().len(), 3);
    }

    #[test]
    fn test_sql_push_if() {
        let sql = Sql::new("SELECT * FROM \"Post\"")
            .push_if(true, " WHERE TRUE")
            .push_if(false, " AND FALSE");
        assert_eq!(sql.to_string(), "SELECT * FROM \"Post\" WHERE TRUE");
    }

    #[test]
    fn test_sql_into_statement() {
        let statement: Statement = Sql::new("SELECT ").push_bind("", "x").into();
        assert_eq!(statement.sql, "SELECT $1");
        assert_eq!(statement.params.len(), 1);
    }

    // ==========================================================================
    // raw_query!
    // ==========================================================================

    #[test]
    fn test_raw_query_macro_without_params() {
        let sql = raw_query!("SELECT 1");
        assert_eq!(sql.sql(), "SELECT 1");
        assert!(sql.params().is_empty());
    }

    #[test]
    fn test_raw_query_macro_with_params() {
        let sql = raw_query!("SELECT * FROM \"Tweet\" WHERE \"likeCount\" > {} AND \"text\" = {}", 5, "hi");
        assert_eq!(
            sql.sql(),
            "SELECT * FROM \"Tweet\" WHERE \"likeCount\" > $1 AND \"text\" = $2"
        );
        assert_eq!(sql.params(), &[FilterValue::Int(5), FilterValue::String("hi".into())]);
    }

    // ==========================================================================
    // Execution
    // ==========================================================================

    #[tokio::test]
    async fn test_query_raw_as() {
        #[derive(serde::Deserialize)]
        struct Total {
            total: i64,
        }

        let engine = MockEngine::new();
        engine.push_rows([json!({"total": 3})]);
        let rows: Vec<Total> = query_raw_as(&engine, raw_query!("SELECT COUNT(*) AS total FROM \"Post\"").into())
            .await
            .unwrap();
        assert_eq!(rows[0].total, 3);
    }

    #[tokio::test]
    async fn test_raw_failure_is_p2010() {
        let engine = MockEngine::new();
        engine.push_error(QueryError::database("syntax error at or near \"SELEC\""));
        let err = execute_raw(&engine, Statement::sql("SELEC 1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RawQueryFailed);
        assert_eq!(err.kind(), ErrorKind::UnknownRequest);
    }

    #[tokio::test]
    async fn test_raw_failure_keeps_known_codes() {
        let engine = MockEngine::new();
        engine.push_error(QueryError::unique_violation("Post", "id"));
        let err = execute_raw(&engine, Statement::sql("INSERT INTO \"Post\" VALUES (1)"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);
    }

    #[tokio::test]
    async fn test_empty_raw_query_is_rejected() {
        let engine = MockEngine::new();
        let err = query_raw(&engine, Statement::sql("  ")).await.unwrap_err();
        assert!(err.is_validation());
        assert!(engine.statements().is_empty());
    }
}
