//! Query extensions.
//!
//! An extension sits between the client and the engine and sees every
//! statement. It can rewrite the statement before it runs, change the result
//! afterwards, or answer without calling the engine at all.
//!
//! ```rust,ignore
//! use reportdb_query::extension::{QueryExtension, QueryContext, QueryOutput, Next};
//!
//! struct Audit;
//!
//! impl QueryExtension for Audit {
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: QueryContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, QueryResult<QueryOutput>> {
//!         Box::pin(async move {
//!             println!("running {}", ctx.statement.sql);
//!             next.run(ctx).await
//!         })
//!     }
//! }
//!
//! let audited = client.extends(Audit);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::QueryResult;
use crate::sql::Statement;
use crate::traits::{BoxFuture, Row};

/// Whether a statement returns rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Rows are returned (`SELECT`, `… RETURNING`).
    Query,
    /// Only the affected-row count is returned.
    Execute,
}

/// The statement passing through the extension chain.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    /// The statement to run.
    pub statement: Statement,
    /// What the caller expects back.
    pub kind: QueryKind,
}

impl QueryContext {
    /// Create a context.
    pub fn new(statement: Statement, kind: QueryKind) -> Self {
        Self { statement, kind }
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.statement.sql
    }
}

/// The result passing back through the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Returned rows.
    Rows(Vec<Row>),
    /// Affected-row count.
    Affected(u64),
}

impl QueryOutput {
    /// The rows, or none for a count.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Affected(_) => Vec::new(),
        }
    }

    /// The affected-row count (the number of rows for a row result).
    pub fn affected(&self) -> u64 {
        match self {
            Self::Rows(rows) => rows.len() as u64,
            Self::Affected(n) => *n,
        }
    }
}

/// The rest of the chain.
pub struct Next<'a> {
    inner: Box<dyn FnOnce(QueryContext) -> BoxFuture<'a, QueryResult<QueryOutput>> + Send + 'a>,
}

impl<'a> Next<'a> {
    /// Run the remaining extensions and the engine.
    pub fn run(self, ctx: QueryContext) -> BoxFuture<'a, QueryResult<QueryOutput>> {
        (self.inner)(ctx)
    }
}

/// A query extension.
pub trait QueryExtension: Send + Sync {
    /// Handle a statement, usually by calling `next`.
    fn handle<'a>(&'a self, ctx: QueryContext, next: Next<'a>) -> BoxFuture<'a, QueryResult<QueryOutput>>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An ordered, immutable list of extensions.
///
/// Adding an extension produces a new chain; clients that share the old
/// chain are unaffected.
#[derive(Clone, Default)]
pub struct ExtensionChain {
    extensions: Arc<Vec<Arc<dyn QueryExtension>>>,
}

impl ExtensionChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new chain with `extension` appended.
    pub fn with(&self, extension: impl QueryExtension + 'static) -> Self {
        let mut extensions: Vec<_> = self.extensions.iter().cloned().collect();
        extensions.push(Arc::new(extension));
        Self {
            extensions: Arc::new(extensions),
        }
    }

    /// Number of extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Names of the extensions, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// Run `ctx` through the chain, ending in `handler`.
    pub fn execute<'a, F>(&'a self, ctx: QueryContext, handler: F) -> BoxFuture<'a, QueryResult<QueryOutput>>
    where
        F: FnOnce(QueryContext) -> BoxFuture<'a, QueryResult<QueryOutput>> + Send + 'a,
    {
        self.execute_at(0, ctx, handler)
    }

    fn execute_at<'a, F>(
        &'a self,
        index: usize,
        ctx: QueryContext,
        handler: F,
    ) -> BoxFuture<'a, QueryResult<QueryOutput>>
    where
        F: FnOnce(QueryContext) -> BoxFuture<'a, QueryResult<QueryOutput>> + Send + 'a,
    {
        let Some(extension) = self.extensions.get(index) else {
            return handler(ctx);
        };
        let next = Next {
            inner: Box::new(move |ctx| self.execute_at(index + 1, ctx, handler)),
        };
        extension.handle(ctx, next)
    }
}

impl fmt::Debug for ExtensionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Extension rewriting every statement before it runs.
pub struct StatementRewrite<F> {
    name: &'static str,
    rewrite: F,
}

/// Rewrite statements with `f`.
pub fn rewrite_statement<F>(name: &'static str, f: F) -> StatementRewrite<F>
where
    F: Fn(&mut Statement) + Send + Sync,
{
    StatementRewrite { name, rewrite: f }
}

impl<F> QueryExtension for StatementRewrite<F>
where
    F: Fn(&mut Statement) + Send + Sync,
{
    fn handle<'a>(&'a self, mut ctx: QueryContext, next: Next<'a>) -> BoxFuture<'a, QueryResult<QueryOutput>> {
        (self.rewrite)(&mut ctx.statement);
        next.run(ctx)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Extension changing every returned row.
pub struct RowMapper<F> {
    name: &'static str,
    map: F,
}

/// Apply `f` to every returned row.
pub fn map_rows<F>(name: &'static str, f: F) -> RowMapper<F>
where
    F: Fn(&mut Row) + Send + Sync,
{
    RowMapper { name, map: f }
}

impl<F> QueryExtension for RowMapper<F>
where
    F: Fn(&mut Row) + Send + Sync,
{
    fn handle<'a>(&'a self, ctx: QueryContext, next: Next<'a>) -> BoxFuture<'a, QueryResult<QueryOutput>> {
        Box::pin(async move {
            match next.run(ctx).await? {
                QueryOutput::Rows(mut rows) => {
                    rows.iter_mut().for_each(|row| (self.map)(row));
                    Ok(QueryOutput::Rows(rows))
                }
                other => Ok(other),
            }
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
