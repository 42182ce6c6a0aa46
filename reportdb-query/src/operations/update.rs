//! Update operations: `update`, `update_many` and `update_many_and_return`.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, Where};
use crate::inputs::Assignment;
use crate::meta::{FieldMeta, ModelMeta};
use crate::sql::{Scope, SqlBuilder, Statement, quote_identifier};
use crate::traits::{Model, QueryEngine, Row, UniqueFilter, UpdateData};

use super::{
    Columns, Projection, decode, decode_all, finish, projection_methods, push_assignments, push_limited_where,
    push_where, select_list, update_assignments,
};

type Assignments = Vec<(&'static FieldMeta, Assignment)>;

/// Updates the record identified by a unique value and returns it.
///
/// Fails with `P2025` when no record matches.
///
/// # Example
///
/// ```rust,ignore
/// let report = client
///     .report()
///     .update(
///         report::UniqueWhere::PublicId(public_id),
///         report::UpdateInput {
///             email_sent_at: Some(Some(Utc::now())),
///             ..Default::default()
///         },
///     )
///     .exec()
///     .await?;
/// ```
pub struct UpdateOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    assignments: Assignments,
    projection: Projection,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> UpdateOperation<E, M> {
    /// Create a new Update operation.
    pub fn new(engine: E, unique: M::UniqueWhere, data: M::UpdateInput) -> Self {
        Self {
            engine,
            filter: unique.into_filter(),
            assignments: update_assignments(M::meta(), data.into_assignments()),
            projection: Projection::default(),
            _model: PhantomData,
        }
    }

    /// Require additional non-unique conditions.
    pub fn and_where(mut self, filter: Where<M>) -> Self {
        self.filter = self.filter.and_then(filter.into_filter());
        self
    }

    projection_methods!(projection);

    /// With nothing to change the record is read back unchanged.
    fn build(&self) -> QueryResult<(Statement, Columns)> {
        let meta = M::meta();
        let columns = self.projection.columns(meta, &[])?;
        let scope = Scope::root(meta.table);
        let mut builder = SqlBuilder::new();
        if self.assignments.is_empty() {
            builder
                .push("SELECT ")
                .push(select_list(&columns.fields))
                .push(" FROM ")
                .push(scope.from_clause());
            push_where(&mut builder, &scope, &self.filter, None);
            builder.push(" LIMIT 1");
        } else {
            builder.push(format!("UPDATE {} SET ", quote_identifier(meta.table)));
            push_assignments(&mut builder, &self.assignments);
            push_where(&mut builder, &scope, &self.filter, None);
            builder.push(" RETURNING ").push(select_list(&columns.fields));
        }
        Ok((builder.build(), columns))
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.build().map(|(statement, _)| statement)
    }

    /// Execute the update.
    pub async fn exec(self) -> QueryResult<M> {
        self.exec_as().await
    }

    /// Execute the update and decode the record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<T> {
        decode(self.exec_rows().await?)
    }

    /// Execute the update and return the row.
    pub async fn exec_rows(self) -> QueryResult<Row> {
        let (statement, columns) = self.build()?;
        debug!(model = M::MODEL_NAME, fields = self.assignments.len(), "Updating record");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        let rows = finish(&self.engine, &self.projection, &columns, rows).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| QueryError::not_found(M::MODEL_NAME).with_context("update"))
    }
}

fn bulk_update_sql(
    meta: &'static ModelMeta,
    assignments: &Assignments,
    filter: &Filter,
    limit: Option<u64>,
    returning: Option<&Columns>,
) -> QueryResult<Statement> {
    let mut builder = SqlBuilder::new();
    builder.push(format!("UPDATE {} SET ", quote_identifier(meta.table)));
    push_assignments(&mut builder, assignments);
    push_limited_where(&mut builder, meta, filter, limit)?;
    if let Some(columns) = returning {
        builder.push(" RETURNING ").push(select_list(&columns.fields));
    }
    Ok(builder.build())
}

/// Updates every record matching a filter and returns how many changed.
pub struct UpdateManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    assignments: Assignments,
    limit: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> UpdateManyOperation<E, M> {
    /// Create a new UpdateMany operation.
    pub fn new(engine: E, data: M::UpdateInput) -> Self {
        Self {
            engine,
            filter: Filter::None,
            assignments: update_assignments(M::meta(), data.into_assignments()),
            limit: None,
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: Where<M>) -> Self {
        self.filter = self.filter.and_then(filter.into_filter());
        self
    }

    /// Update at most `n` records.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Build the SQL query, or `None` when there is nothing to change.
    pub fn build_sql(&self) -> QueryResult<Option<Statement>> {
        if self.assignments.is_empty() {
            return Ok(None);
        }
        bulk_update_sql(M::meta(), &self.assignments, &self.filter, self.limit, None).map(Some)
    }

    /// Execute the update.
    pub async fn exec(self) -> QueryResult<u64> {
        let Some(statement) = self.build_sql()? else {
            return Ok(0);
        };
        debug!(model = M::MODEL_NAME, limit = ?self.limit, "Updating records");
        self.engine.execute(&statement.sql, statement.params).await
    }
}

/// Updates every record matching a filter and returns the updated records.
pub struct UpdateManyAndReturnOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    assignments: Assignments,
    limit: Option<u64>,
    projection: Projection,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> UpdateManyAndReturnOperation<E, M> {
    /// Create a new UpdateManyAndReturn operation.
    pub fn new(engine: E, data: M::UpdateInput) -> Self {
        Self {
            engine,
            filter: Filter::None,
            assignments: update_assignments(M::meta(), data.into_assignments()),
            limit: None,
            projection: Projection::default(),
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: Where<M>) -> Self {
        self.filter = self.filter.and_then(filter.into_filter());
        self
    }

    /// Update at most `n` records.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    projection_methods!(projection);

    fn build(&self) -> QueryResult<Option<(Statement, Columns)>> {
        if self.assignments.is_empty() {
            return Ok(None);
        }
        let columns = self.projection.columns(M::meta(), &[])?;
        let statement = bulk_update_sql(
            M::meta(),
            &self.assignments,
            &self.filter,
            self.limit,
            Some(&columns),
        )?;
        Ok(Some((statement, columns)))
    }

    /// Build the SQL query, or `None` when there is nothing to change.
    pub fn build_sql(&self) -> QueryResult<Option<Statement>> {
        Ok(self.build()?.map(|(statement, _)| statement))
    }

    /// Execute the update.
    pub async fn exec(self) -> QueryResult<Vec<M>> {
        self.exec_as().await
    }

    /// Execute the update and decode every record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<Vec<T>> {
        decode_all(self.exec_rows().await?)
    }

    /// Execute the update and return the rows.
    pub async fn exec_rows(self) -> QueryResult<Vec<Row>> {
        let Some((statement, columns)) = self.build()? else {
            return Ok(Vec::new());
        };
        debug!(model = M::MODEL_NAME, limit = ?self.limit, "Updating records");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        finish(&self.engine, &self.projection, &columns, rows).await
    }
}
