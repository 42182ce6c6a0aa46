//! Delete operations: `delete` and `delete_many`.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, Where};
use crate::pagination::Pagination;
use crate::sql::{Scope, SqlBuilder, Statement, quote_identifier};
use crate::traits::{Model, QueryEngine, Row, UniqueFilter};

use super::{Columns, ReadArgs, decode, finish, projection_methods, push_limited_where, push_where, select_list};

/// Deletes the record identified by a unique value and returns it.
///
/// Fails with `P2025` when no record matches. When relations are included
/// they are loaded before the delete, while they still exist.
pub struct DeleteOperation<E: QueryEngine, M: Model> {
    engine: E,
    args: ReadArgs,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> DeleteOperation<E, M> {
    /// Create a new Delete operation.
    pub fn new(engine: E, unique: M::UniqueWhere) -> Self {
        Self {
            engine,
            args: ReadArgs {
                filter: unique.into_filter(),
                pagination: Pagination::new().take(1),
                ..Default::default()
            },
            _model: PhantomData,
        }
    }

    /// Require additional non-unique conditions.
    pub fn and_where(mut self, filter: Where<M>) -> Self {
        self.args.filter = self.args.filter.and_then(filter.into_filter());
        self
    }

    projection_methods!(args.projection);

    fn delete_sql(&self, returning: Option<&Columns>) -> Statement {
        let meta = M::meta();
        let mut builder = SqlBuilder::new();
        builder.push(format!("DELETE FROM {}", quote_identifier(meta.table)));
        push_where(&mut builder, &Scope::root(meta.table), &self.args.filter, None);
        if let Some(columns) = returning {
            builder.push(" RETURNING ").push(select_list(&columns.fields));
        }
        builder.build()
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        let columns = self.args.projection.columns(M::meta(), &[])?;
        Ok(self.delete_sql(Some(&columns)))
    }

    /// Execute the delete.
    pub async fn exec(self) -> QueryResult<M> {
        self.exec_as().await
    }

    /// Execute the delete and decode the record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<T> {
        decode(self.exec_rows().await?)
    }

    /// Execute the delete and return the row.
    pub async fn exec_rows(self) -> QueryResult<Row> {
        let missing = || QueryError::not_found(M::MODEL_NAME).with_context("delete");
        debug!(model = M::MODEL_NAME, "Deleting record");

        if self.args.projection.has_relations() {
            let record = self
                .args
                .fetch(&self.engine, M::meta())
                .await?
                .into_iter()
                .next()
                .ok_or_else(missing)?;
            let statement = self.delete_sql(None);
            let deleted = self.engine.execute(&statement.sql, statement.params).await?;
            if deleted == 0 {
                return Err(missing());
            }
            return Ok(record);
        }

        let columns = self.args.projection.columns(M::meta(), &[])?;
        let statement = self.delete_sql(Some(&columns));
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        let rows = finish(&self.engine, &self.args.projection, &columns, rows).await?;
        rows.into_iter().next().ok_or_else(missing)
    }
}

/// Deletes every record matching a filter and returns how many were deleted.
pub struct DeleteManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    limit: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> DeleteManyOperation<E, M> {
    /// Create a new DeleteMany operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: Filter::None,
            limit: None,
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: Where<M>) -> Self {
        self.filter = self.filter.and_then(filter.into_filter());
        self
    }

    /// Delete at most `n` records.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        let meta = M::meta();
        let mut builder = SqlBuilder::new();
        builder.push(format!("DELETE FROM {}", quote_identifier(meta.table)));
        push_limited_where(&mut builder, meta, &self.filter, self.limit)?;
        Ok(builder.build())
    }

    /// Execute the delete.
    pub async fn exec(self) -> QueryResult<u64> {
        let statement = self.build_sql()?;
        debug!(model = M::MODEL_NAME, limit = ?self.limit, "Deleting records");
        self.engine.execute(&statement.sql, statement.params).await
    }
}
