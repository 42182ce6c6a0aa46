//! SQL rendering utilities.
//!
//! All statements target PostgreSQL: identifiers are always double-quoted and
//! values are bound as `$n` placeholders.

use std::fmt;

use crate::filter::FilterValue;

/// Quote an identifier, doubling any embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Escape `LIKE` wildcards so a value matches literally.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// A rendered SQL statement and its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// The SQL text with `$n` placeholders.
    pub sql: String,
    /// Parameter values, in placeholder order.
    pub params: Vec<FilterValue>,
}

impl Statement {
    /// Create a statement from SQL and parameters.
    pub fn new(sql: impl Into<String>, params: Vec<FilterValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Create a statement without parameters.
    pub fn sql(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Incremental builder that keeps placeholder numbering consistent.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<FilterValue>,
}

impl SqlBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push literal SQL.
    pub fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.sql.push_str(sql.as_ref());
        self
    }

    /// Bind a value and push its placeholder.
    pub fn push_param(&mut self, value: impl Into<FilterValue>) -> &mut Self {
        self.params.push(value.into());
        let index = self.params.len();
        self.sql.push('$');
        self.sql.push_str(&index.to_string());
        self
    }

    /// Push a quoted identifier.
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_identifier(name));
        self
    }

    /// Push `items` separated by `sep`, rendering each with `f`.
    pub fn push_separated<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        sep: &str,
        mut f: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            f(self, item);
        }
        self
    }

    /// The SQL rendered so far.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The parameters bound so far.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }

    /// The index the next bound parameter will get.
    pub fn next_param_index(&self) -> usize {
        self.params.len() + 1
    }

    /// Finish building.
    pub fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Table reference used while rendering columns.
///
/// The root scope renders bare column names. Nested scopes belong to
/// correlated subqueries and qualify every column with their alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    table: &'static str,
    alias: Option<String>,
    depth: usize,
}

impl Scope {
    /// Scope of the statement's main table.
    pub fn root(table: &'static str) -> Self {
        Self {
            table,
            alias: None,
            depth: 0,
        }
    }

    /// Scope of a subquery over `table`, one level deeper than `self`.
    pub fn nested(&self, table: &'static str) -> Self {
        let depth = self.depth + 1;
        Self {
            table,
            alias: Some(format!("r{}", depth)),
            depth,
        }
    }

    /// The table this scope reads from.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// The `FROM` item for this scope.
    pub fn from_clause(&self) -> String {
        match &self.alias {
            Some(alias) => format!(
                "{} AS {}",
                quote_identifier(self.table),
                quote_identifier(alias)
            ),
            None => quote_identifier(self.table),
        }
    }

    /// A column as referenced from inside this scope.
    pub fn column(&self, column: &str) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{}", quote_identifier(alias), quote_identifier(column)),
            None => quote_identifier(column),
        }
    }

    /// A column as referenced from a nested subquery.
    pub fn qualified(&self, column: &str) -> String {
        let qualifier = self.alias.as_deref().unwrap_or(self.table);
        format!("{}.{}", quote_identifier(qualifier), quote_identifier(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("User"), "\"User\"");
        assert_eq!(quote_identifier("refresh_token"), "\"refresh_token\"");
        assert_eq!(quote_identifier("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_sql_builder() {
        let mut builder = SqlBuilder::new();
        builder
            .push("SELECT * FROM ")
            .push_identifier("User")
            .push(" WHERE ")
            .push_identifier("id")
            .push(" = ")
            .push_param("abc");
        assert_eq!(builder.next_param_index(), 2);

        let statement = builder.build();
        assert_eq!(statement.sql, "SELECT * FROM \"User\" WHERE \"id\" = $1");
        assert_eq!(statement.params, vec![FilterValue::String("abc".into())]);
    }

    #[test]
    fn test_push_separated() {
        let mut builder = SqlBuilder::new();
        builder.push_separated([1, 2, 3], ", ", |b, v| {
            b.push_param(v);
        });
        let statement = builder.build();
        assert_eq!(statement.sql, "$1, $2, $3");
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_scopes() {
        let root = Scope::root("Post");
        assert_eq!(root.from_clause(), "\"Post\"");
        assert_eq!(root.column("name"), "\"name\"");
        assert_eq!(root.qualified("createdById"), "\"Post\".\"createdById\"");

        let nested = root.nested("User");
        assert_eq!(nested.from_clause(), "\"User\" AS \"r1\"");
        assert_eq!(nested.column("id"), "\"r1\".\"id\"");
        assert_eq!(nested.nested("Account").column("userId"), "\"r2\".\"userId\"");
    }
}
