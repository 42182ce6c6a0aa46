//! Create operations: `create`, `create_many` and `create_many_and_return`.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::meta::{FieldMeta, ModelMeta};
use crate::sql::{SqlBuilder, Statement, quote_identifier};
use crate::traits::{CreateData, Model, QueryEngine, Row};

use super::{Columns, Projection, decode, decode_all, finish, insert_values, projection_methods, select_list};

type InsertRow = Vec<(&'static FieldMeta, FilterValue)>;

/// Render a multi-row `INSERT`.
///
/// The column list is the union of the columns set by any row, in field
/// order; rows that leave a column unset insert `DEFAULT`.
fn insert_sql(
    meta: &'static ModelMeta,
    rows: &[InsertRow],
    skip_duplicates: bool,
    returning: Option<&Columns>,
) -> Statement {
    let mut columns: Vec<&'static FieldMeta> = meta
        .fields
        .iter()
        .filter(|field| rows.iter().any(|row| row.iter().any(|(f, _)| f.name == field.name)))
        .collect();

    let mut builder = SqlBuilder::new();
    builder.push(format!("INSERT INTO {}", quote_identifier(meta.table)));

    if columns.is_empty() && rows.len() == 1 {
        builder.push(" DEFAULT VALUES");
    } else {
        if columns.is_empty() {
            // Several all-default rows: spell out DEFAULT for the key.
            columns = meta.primary_key_fields();
            if columns.is_empty() {
                columns.extend(meta.fields.first());
            }
        }
        builder.push(" (");
        builder.push_separated(&columns, ", ", |b, f| {
            b.push_identifier(f.column);
        });
        builder.push(") VALUES ");
        builder.push_separated(rows, ", ", |b, row| {
            b.push("(");
            b.push_separated(&columns, ", ", |b, column| {
                match row.iter().find(|(f, _)| f.name == column.name) {
                    Some((_, value)) => b.push_param(value.clone()),
                    None => b.push("DEFAULT"),
                };
            });
            b.push(")");
        });
    }

    if skip_duplicates {
        builder.push(" ON CONFLICT DO NOTHING");
    }
    if let Some(columns) = returning {
        builder.push(" RETURNING ").push(select_list(&columns.fields));
    }
    builder.build()
}

/// Creates one record and returns it.
///
/// # Example
///
/// ```rust,ignore
/// let wallet = client
///     .tezos_wallet()
///     .create(tezos_wallet::CreateInput {
///         address: "tz1...".into(),
///         ..Default::default()
///     })
///     .exec()
///     .await?;
/// ```
pub struct CreateOperation<E: QueryEngine, M: Model> {
    engine: E,
    values: InsertRow,
    projection: Projection,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> CreateOperation<E, M> {
    /// Create a new Create operation.
    pub fn new(engine: E, data: M::CreateInput) -> Self {
        Self {
            engine,
            values: insert_values(M::meta(), data.into_values()),
            projection: Projection::default(),
            _model: PhantomData,
        }
    }

    projection_methods!(projection);

    fn build(&self) -> QueryResult<(Statement, Columns)> {
        let meta = M::meta();
        let columns = self.projection.columns(meta, &[])?;
        let statement = insert_sql(meta, std::slice::from_ref(&self.values), false, Some(&columns));
        Ok((statement, columns))
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.build().map(|(statement, _)| statement)
    }

    /// Execute the insert.
    pub async fn exec(self) -> QueryResult<M> {
        self.exec_as().await
    }

    /// Execute the insert and decode the record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<T> {
        decode(self.exec_rows().await?)
    }

    /// Execute the insert and return the row.
    pub async fn exec_rows(self) -> QueryResult<Row> {
        let (statement, columns) = self.build()?;
        debug!(model = M::MODEL_NAME, "Creating record");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        let rows = finish(&self.engine, &self.projection, &columns, rows).await?;
        rows.into_iter().next().ok_or_else(|| {
            QueryError::database(format!("INSERT into {} returned no record", M::TABLE_NAME))
                .with_model(M::MODEL_NAME)
        })
    }
}

/// Creates many records and returns how many were inserted.
pub struct CreateManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    rows: Vec<InsertRow>,
    skip_duplicates: bool,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> CreateManyOperation<E, M> {
    /// Create a new CreateMany operation.
    pub fn new(engine: E, data: impl IntoIterator<Item = M::CreateInput>) -> Self {
        Self {
            engine,
            rows: data
                .into_iter()
                .map(|input| insert_values(M::meta(), input.into_values()))
                .collect(),
            skip_duplicates: false,
            _model: PhantomData,
        }
    }

    /// Ignore rows that violate a unique constraint.
    pub fn skip_duplicates(mut self) -> Self {
        self.skip_duplicates = true;
        self
    }

    /// Build the SQL query, or `None` when there is nothing to insert.
    pub fn build_sql(&self) -> Option<Statement> {
        if self.rows.is_empty() {
            return None;
        }
        Some(insert_sql(M::meta(), &self.rows, self.skip_duplicates, None))
    }

    /// Execute the insert.
    pub async fn exec(self) -> QueryResult<u64> {
        let Some(statement) = self.build_sql() else {
            return Ok(0);
        };
        debug!(model = M::MODEL_NAME, rows = self.rows.len(), "Creating records");
        self.engine.execute(&statement.sql, statement.params).await
    }
}

/// Creates many records and returns them.
pub struct CreateManyAndReturnOperation<E: QueryEngine, M: Model> {
    engine: E,
    rows: Vec<InsertRow>,
    skip_duplicates: bool,
    projection: Projection,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> CreateManyAndReturnOperation<E, M> {
    /// Create a new CreateManyAndReturn operation.
    pub fn new(engine: E, data: impl IntoIterator<Item = M::CreateInput>) -> Self {
        Self {
            engine,
            rows: data
                .into_iter()
                .map(|input| insert_values(M::meta(), input.into_values()))
                .collect(),
            skip_duplicates: false,
            projection: Projection::default(),
            _model: PhantomData,
        }
    }

    /// Ignore rows that violate a unique constraint.
    pub fn skip_duplicates(mut self) -> Self {
        self.skip_duplicates = true;
        self
    }

    projection_methods!(projection);

    fn build(&self) -> QueryResult<Option<(Statement, Columns)>> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        let meta = M::meta();
        let columns = self.projection.columns(meta, &[])?;
        let statement = insert_sql(meta, &self.rows, self.skip_duplicates, Some(&columns));
        Ok(Some((statement, columns)))
    }

    /// Build the SQL query, or `None` when there is nothing to insert.
    pub fn build_sql(&self) -> QueryResult<Option<Statement>> {
        Ok(self.build()?.map(|(statement, _)| statement))
    }

    /// Execute the insert.
    pub async fn exec(self) -> QueryResult<Vec<M>> {
        self.exec_as().await
    }

    /// Execute the insert and decode every record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<Vec<T>> {
        decode_all(self.exec_rows().await?)
    }

    /// Execute the insert and return the rows.
    pub async fn exec_rows(self) -> QueryResult<Vec<Row>> {
        let Some((statement, columns)) = self.build()? else {
            return Ok(Vec::new());
        };
        debug!(model = M::MODEL_NAME, rows = self.rows.len(), "Creating records");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        finish(&self.engine, &self.projection, &columns, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::test_models::{Post, User, post, user};
    use crate::testing::MockEngine;

    fn post_input(name: &str) -> post::CreateInput {
        post::CreateInput {
            name: name.into(),
            created_by_id: "u1".into(),
            ..Default::default()
        }
    }

    // ==========================================================================
    // create
    // ==========================================================================

    #[test]
    fn test_create_fills_runtime_defaults() {
        let statement = CreateOperation::<_, Post>::new(MockEngine::new(), post_input("hello"))
            .build_sql()
            .unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"Post\" (\"name\", \"createdAt\", \"updatedAt\", \"createdById\") \
             VALUES ($1, $2, $3, $4) \
             RETURNING \"id\", \"name\", \"createdAt\", \"updatedAt\", \"createdById\""
        );
        assert_eq!(statement.params[0], FilterValue::String("hello".into()));
        assert!(matches!(statement.params[1], FilterValue::DateTime(_)));
    }

    #[test]
    fn test_create_generates_uuid_ids() {
        let statement = CreateOperation::<_, User>::new(MockEngine::new(), user::CreateInput::default())
            .select([user::ScalarField::Id])
            .build_sql()
            .unwrap();
        assert_eq!(statement.sql, "INSERT INTO \"User\" (\"id\") VALUES ($1) RETURNING \"id\"");
    }

    #[tokio::test]
    async fn test_create_returns_record() {
        let engine = MockEngine::new();
        engine.push_rows([json!({"id": "u1", "name": "ada", "email": null})]);
        let created = CreateOperation::<_, User>::new(
            engine.clone(),
            user::CreateInput {
                name: Some("ada".into()),
                ..Default::default()
            },
        )
        .exec()
        .await
        .unwrap();
        assert_eq!(created.id, "u1");
        assert_eq!(created.name.as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn test_create_without_returned_row_fails() {
        let err = CreateOperation::<_, User>::new(MockEngine::new(), user::CreateInput::default())
            .exec()
            .await
            .unwrap_err();
        assert!(err.message.contains("returned no record"));
    }

    // ==========================================================================
    // create_many
    // ==========================================================================

    #[test]
    fn test_create_many_unions_columns() {
        let with_id = post::CreateInput {
            id: Some(7),
            ..post_input("b")
        };
        let op = CreateManyOperation::<_, Post>::new(MockEngine::new(), [post_input("a"), with_id]).skip_duplicates();
        let statement = op.build_sql().unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"Post\" (\"id\", \"name\", \"createdAt\", \"updatedAt\", \"createdById\") \
             VALUES (DEFAULT, $1, $2, $3, $4), ($5, $6, $7, $8, $9) ON CONFLICT DO NOTHING"
        );
        assert_eq!(statement.params[4], FilterValue::Int(7));
    }

    #[tokio::test]
    async fn test_create_many_empty_is_a_no_op() {
        let engine = MockEngine::new();
        let count = CreateManyOperation::<_, Post>::new(engine.clone(), Vec::new())
            .exec()
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(engine.statements().is_empty());
    }

    #[tokio::test]
    async fn test_create_many_returns_count() {
        let engine = MockEngine::new();
        engine.push_affected(2);
        let count = CreateManyOperation::<_, Post>::new(engine, [post_input("a"), post_input("b")])
            .exec()
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_create_many_and_return() {
        let engine = MockEngine::new();
        engine.push_rows([json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})]);
        let rows = CreateManyAndReturnOperation::<_, Post>::new(engine.clone(), [post_input("a"), post_input("b")])
            .select([post::ScalarField::Id, post::ScalarField::Name])
            .exec_rows()
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(
            engine
                .last_statement()
                .unwrap()
                .sql
                .ends_with("RETURNING \"id\", \"name\"")
        );
    }
}
