//! Upsert operation: create a record, or update it when it already exists.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::inputs::Assignment;
use crate::meta::{FieldMeta, ModelMeta};
use crate::sql::{SqlBuilder, Statement, quote_identifier};
use crate::traits::{CreateData, Model, QueryEngine, Row, UniqueFilter, UpdateData};

use super::{Columns, Projection, decode, finish, insert_values, projection_methods, select_list, update_assignments};

/// Creates or updates the record identified by a unique value.
///
/// Rendered as a single `INSERT … ON CONFLICT (…) DO UPDATE`, with the
/// columns of the unique value as the conflict target. The identifier of the
/// unique value is written into the create data; create data naming a
/// different identifier is rejected.
///
/// # Example
///
/// ```rust,ignore
/// let user = client
///     .twitter_user()
///     .upsert(
///         twitter_user::UniqueWhere::ExternalUserId(external_id.clone()),
///         twitter_user::CreateInput { handle, external_user_id: external_id, ..Default::default() },
///         twitter_user::UpdateInput { handle: Some(handle), ..Default::default() },
///     )
///     .exec()
///     .await?;
/// ```
pub struct UpsertOperation<E: QueryEngine, M: Model> {
    engine: E,
    conflict: &'static [&'static str],
    values: Vec<(&'static FieldMeta, FilterValue)>,
    conflicting: Option<String>,
    assignments: Vec<(&'static FieldMeta, Assignment)>,
    projection: Projection,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> UpsertOperation<E, M> {
    /// Create a new Upsert operation.
    pub fn new(engine: E, unique: M::UniqueWhere, create: M::CreateInput, update: M::UpdateInput) -> Self {
        let conflict = unique.columns();
        let (values, conflicting) = merge_identifier(M::meta(), unique.into_filter(), create.into_values());
        Self {
            engine,
            conflict,
            values: insert_values(M::meta(), values),
            conflicting,
            assignments: update_assignments(M::meta(), update.into_assignments()),
            projection: Projection::default(),
            _model: PhantomData,
        }
    }

    projection_methods!(projection);

    fn build(&self) -> QueryResult<(Statement, Columns)> {
        let meta = M::meta();
        if let Some(field) = &self.conflicting {
            return Err(QueryError::validation(format!(
                "upsert on {}: create data sets `{}` to a different value than the unique where",
                meta.name, field
            ))
            .with_model(meta.name)
            .with_field(field.clone()));
        }
        if self.values.is_empty() {
            return Err(QueryError::validation(format!(
                "upsert on {} needs create data carrying the unique identifier",
                meta.name
            ))
            .with_model(meta.name));
        }
        let columns = self.projection.columns(meta, &[])?;
        let table = quote_identifier(meta.table);

        let mut builder = SqlBuilder::new();
        builder.push(format!("INSERT INTO {} (", table));
        builder.push_separated(&self.values, ", ", |b, (field, _)| {
            b.push_identifier(field.column);
        });
        builder.push(") VALUES (");
        builder.push_separated(&self.values, ", ", |b, (_, value)| {
            b.push_param(value.clone());
        });
        builder.push(") ON CONFLICT (");
        builder.push_separated(self.conflict, ", ", |b, column| {
            b.push_identifier(column);
        });
        builder.push(") DO UPDATE SET ");
        if self.assignments.is_empty() {
            // A no-op assignment still makes the existing row come back.
            let column = quote_identifier(self.conflict.first().copied().unwrap_or(self.values[0].0.column));
            builder.push(format!("{} = {}.{}", column, table, column));
        } else {
            builder.push_separated(&self.assignments, ", ", |b, (field, assignment)| {
                assignment.to_sql(field.column, b);
            });
        }
        builder.push(" RETURNING ").push(select_list(&columns.fields));
        Ok((builder.build(), columns))
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.build().map(|(statement, _)| statement)
    }

    /// Execute the upsert.
    pub async fn exec(self) -> QueryResult<M> {
        self.exec_as().await
    }

    /// Execute the upsert and decode the record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<T> {
        decode(self.exec_rows().await?)
    }

    /// Execute the upsert and return the row.
    pub async fn exec_rows(self) -> QueryResult<Row> {
        let (statement, columns) = self.build()?;
        debug!(model = M::MODEL_NAME, conflict = ?self.conflict, "Upserting record");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        let rows = finish(&self.engine, &self.projection, &columns, rows).await?;
        rows.into_iter().next().ok_or_else(|| {
            QueryError::database(format!("upsert into {} returned no record", M::TABLE_NAME))
                .with_model(M::MODEL_NAME)
        })
    }
}

/// Write the identifier values of `unique` into the create values.
///
/// Returns the name of the first field whose create value disagrees with the
/// identifier.
fn merge_identifier(
    meta: &'static ModelMeta,
    unique: Filter,
    mut values: Vec<(&'static str, FilterValue)>,
) -> (Vec<(&'static str, FilterValue)>, Option<String>) {
    let mut conflicting = None;
    for (column, value) in identifier_values(unique) {
        let Some(field) = meta.field_by_column(&column) else {
            continue;
        };
        match values.iter().find(|(name, _)| *name == field.name) {
            Some((_, existing)) if *existing != value => {
                conflicting.get_or_insert_with(|| field.name.to_string());
            }
            Some(_) => {}
            None => values.push((field.name, value)),
        }
    }
    (values, conflicting)
}

fn identifier_values(filter: Filter) -> Vec<(String, FilterValue)> {
    match filter {
        Filter::Equals(column, value) => vec![(column, value)],
        Filter::And(filters) => filters.into_iter().flat_map(identifier_values).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::test_models::{User, user};
    use crate::testing::MockEngine;

    fn create(email: &str) -> user::CreateInput {
        user::CreateInput {
            id: Some("u1".into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_sql() {
        let statement = UpsertOperation::<_, User>::new(
            MockEngine::new(),
            user::UniqueWhere::Email("a@b.c".into()),
            create("a@b.c"),
            user::UpdateInput {
                name: Some(Some("ada".into())),
                ..Default::default()
            },
        )
        .build_sql()
        .unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"User\" (\"id\", \"email\") VALUES ($1, $2) \
             ON CONFLICT (\"email\") DO UPDATE SET \"name\" = $3 \
             RETURNING \"id\", \"name\", \"email\""
        );
    }

    #[test]
    fn test_upsert_without_update_data() {
        let statement = UpsertOperation::<_, User>::new(
            MockEngine::new(),
            user::UniqueWhere::Id("u1".into()),
            create("a@b.c"),
            user::UpdateInput::default(),
        )
        .select([user::ScalarField::Id])
        .build_sql()
        .unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"User\" (\"id\", \"email\") VALUES ($1, $2) \
             ON CONFLICT (\"id\") DO UPDATE SET \"id\" = \"User\".\"id\" RETURNING \"id\""
        );
    }

    #[test]
    fn test_upsert_fills_identifier_from_unique_where() {
        let statement = UpsertOperation::<_, User>::new(
            MockEngine::new(),
            user::UniqueWhere::Id("u9".into()),
            user::CreateInput {
                email: Some("a@b.c".into()),
                ..Default::default()
            },
            user::UpdateInput::default(),
        )
        .build_sql()
        .unwrap();
        assert!(statement.sql.contains("ON CONFLICT (\"id\")"));
        assert_eq!(statement.params[0], FilterValue::String("u9".into()));
    }

    #[test]
    fn test_upsert_rejects_mismatched_identifier() {
        let err = UpsertOperation::<_, User>::new(
            MockEngine::new(),
            user::UniqueWhere::Email("a@b.c".into()),
            create("x@y.z"),
            user::UpdateInput::default(),
        )
        .build_sql()
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert_eq!(err.context.field.as_deref(), Some("email"));
    }

    #[tokio::test]
    async fn test_upsert_returns_record() {
        let engine = MockEngine::new();
        engine.push_rows([json!({"id": "u1", "name": "ada", "email": "a@b.c"})]);
        let user = UpsertOperation::<_, User>::new(
            engine,
            user::UniqueWhere::Id("u1".into()),
            create("a@b.c"),
            user::UpdateInput::default(),
        )
        .exec()
        .await
        .unwrap();
        assert_eq!(user.name.as_deref(), Some("ada"));
    }
}
