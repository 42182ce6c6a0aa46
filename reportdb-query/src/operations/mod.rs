//! Query operations.
//!
//! Every action of a model delegate returns one of these builders. A builder
//! collects its arguments, `build_sql()` renders the statement it will run
//! and `exec()` runs it:
//!
//! - `exec()` decodes into the model payload,
//! - `exec_as::<T>()` decodes into any caller-chosen shape,
//! - `exec_rows()` returns the raw rows.

use std::collections::HashMap;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::inputs::Assignment;
use crate::meta::{DefaultKind, FieldMeta, ModelMeta, RelationMeta};
use crate::relations::IncludeEntry;
use crate::relations::IncludeSpec;
use crate::relations::loader::load_relations;
use crate::sql::{Scope, SqlBuilder, quote_identifier};
use crate::traits::{QueryEngine, Row};

pub mod aggregate;
pub mod count;
pub mod create;
pub mod delete;
pub mod find_first;
pub mod find_many;
pub mod find_unique;
pub mod group_by;
mod read;
pub mod update;
pub mod upsert;

pub use aggregate::{AggregateOperation, AggregateRow};
pub use count::CountOperation;
pub use create::{CreateManyAndReturnOperation, CreateManyOperation, CreateOperation};
pub use delete::{DeleteManyOperation, DeleteOperation};
pub use find_first::FindFirstOperation;
pub use find_many::FindManyOperation;
pub use find_unique::FindUniqueOperation;
pub use group_by::{GroupByOperation, Having, HavingAggregate};
pub use update::{UpdateManyAndReturnOperation, UpdateManyOperation, UpdateOperation};
pub use upsert::UpsertOperation;

pub(crate) use read::ReadArgs;

/// How many records a single-record read must produce.
pub trait Cardinality: Send + 'static {
    /// The result shape for a decoded record of type `T`.
    type Output<T>;

    /// Turn the optional record into the result shape.
    fn resolve<T>(model: &str, record: Option<T>) -> QueryResult<Self::Output<T>>;
}

/// The record may be missing (`find_unique`, `find_first`).
#[derive(Debug, Clone, Copy)]
pub struct Optional;

/// A missing record is a `P2025` error (`*_or_throw`).
#[derive(Debug, Clone, Copy)]
pub struct Required;

impl Cardinality for Optional {
    type Output<T> = Option<T>;

    fn resolve<T>(_model: &str, record: Option<T>) -> QueryResult<Option<T>> {
        Ok(record)
    }
}

impl Cardinality for Required {
    type Output<T> = T;

    fn resolve<T>(model: &str, record: Option<T>) -> QueryResult<T> {
        record.ok_or_else(|| QueryError::not_found(model))
    }
}

/// The `select`/`omit`/`include` arguments of an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Projection {
    pub select: Option<Vec<&'static FieldMeta>>,
    pub omit: Vec<&'static str>,
    pub includes: Vec<IncludeSpec>,
    pub counts: Vec<&'static RelationMeta>,
}

/// The fields a statement reads.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Columns {
    /// Every selected field, in select-list order.
    pub fields: Vec<&'static FieldMeta>,
    /// Fields selected only for joins, removed before results are returned.
    pub hidden: Vec<&'static str>,
}

impl Projection {
    pub fn add(&mut self, entry: IncludeEntry) {
        match entry {
            IncludeEntry::Relation(spec) => {
                self.includes.retain(|s| s.relation != spec.relation);
                self.includes.push(spec);
            }
            IncludeEntry::Count(relation) => {
                if !self.counts.contains(&relation) {
                    self.counts.push(relation);
                }
            }
        }
    }

    pub fn has_relations(&self) -> bool {
        !self.includes.is_empty() || !self.counts.is_empty()
    }

    /// Resolve the fields to read from `meta`, adding the join fields of
    /// every include and the `required` fields as hidden columns.
    pub fn columns(&self, meta: &'static ModelMeta, required: &[&'static str]) -> QueryResult<Columns> {
        let mut fields: Vec<&'static FieldMeta> = match &self.select {
            Some(selected) if selected.is_empty() => {
                return Err(QueryError::validation(format!(
                    "`select` on {} must name at least one field",
                    meta.name
                )));
            }
            Some(selected) => {
                let mut fields = Vec::with_capacity(selected.len());
                for field in selected {
                    if !fields.contains(field) {
                        fields.push(*field);
                    }
                }
                fields
            }
            None => meta
                .fields
                .iter()
                .filter(|f| !self.omit.contains(&f.name))
                .collect(),
        };
        if fields.is_empty() {
            return Err(QueryError::validation(format!(
                "`omit` on {} leaves no fields to return",
                meta.name
            )));
        }

        let join_fields = self
            .includes
            .iter()
            .map(|spec| spec.relation)
            .chain(self.counts.iter().copied())
            .flat_map(|relation| relation.fields.iter().copied());

        let mut hidden = Vec::new();
        for name in join_fields.chain(required.iter().copied()) {
            if fields.iter().any(|f| f.name == name) {
                continue;
            }
            if let Some(field) = meta.field(name) {
                fields.push(field);
                hidden.push(field.name);
            }
        }
        Ok(Columns { fields, hidden })
    }
}

/// Render a select list, aliasing columns to their field names.
pub(crate) fn select_list(fields: &[&'static FieldMeta]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.column == f.name {
                quote_identifier(f.column)
            } else {
                format!("{} AS {}", quote_identifier(f.column), quote_identifier(f.name))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render ` WHERE …` for `filter` and an extra raw condition, or nothing.
pub(crate) fn push_where(builder: &mut SqlBuilder, scope: &Scope, filter: &Filter, extra: Option<String>) {
    match (filter.is_none(), extra) {
        (true, None) => {}
        (true, Some(condition)) => {
            builder.push(" WHERE ").push(condition);
        }
        (false, extra) => {
            builder.push(" WHERE ");
            filter.to_sql(scope, builder);
            if let Some(condition) = extra {
                builder.push(" AND ").push(condition);
            }
        }
    }
}

/// Render `"a" = $1, "b" = "b" + $2`.
pub(crate) fn push_assignments(builder: &mut SqlBuilder, assignments: &[(&'static FieldMeta, Assignment)]) {
    builder.push_separated(assignments, ", ", |b, (field, assignment)| {
        assignment.to_sql(field.column, b);
    });
}

/// Render the ` WHERE …` of a bulk write touching at most `limit` rows
/// matching `filter`.
///
/// PostgreSQL has no `LIMIT` on `UPDATE`/`DELETE`, so the rows are picked by
/// primary key in a subquery.
pub(crate) fn push_limited_where(
    builder: &mut SqlBuilder,
    meta: &'static ModelMeta,
    filter: &Filter,
    limit: Option<u64>,
) -> QueryResult<()> {
    let scope = Scope::root(meta.table);
    let Some(limit) = limit else {
        push_where(builder, &scope, filter, None);
        return Ok(());
    };
    let keys: Vec<String> = meta
        .primary_key_fields()
        .iter()
        .map(|f| quote_identifier(f.column))
        .collect();
    if keys.is_empty() {
        return Err(QueryError::validation(format!(
            "{} has no identifying fields to apply `limit` with",
            meta.name
        ))
        .with_model(meta.name));
    }
    let keys = keys.join(", ");
    builder.push(format!(
        " WHERE ({}) IN (SELECT {} FROM {}",
        keys,
        keys,
        scope.from_clause()
    ));
    push_where(builder, &scope, filter, None);
    builder.push(format!(" LIMIT {})", limit));
    Ok(())
}

/// Values to insert for one create input.
///
/// Unset fields get their runtime defaults: `now()` and `@updatedAt`
/// timestamps, `uuid()` ids and literal defaults. Autoincrement columns are
/// left to the database.
pub(crate) fn insert_values(
    meta: &'static ModelMeta,
    input: Vec<(&'static str, FilterValue)>,
) -> Vec<(&'static FieldMeta, FilterValue)> {
    let mut provided: HashMap<&str, FilterValue> = input.into_iter().collect();
    let now = Utc::now();
    let mut values = Vec::new();
    for field in meta.fields {
        if let Some(value) = provided.remove(field.name) {
            values.push((field, value));
            continue;
        }
        let default = match field.default {
            _ if field.updated_at => Some(FilterValue::DateTime(now)),
            DefaultKind::Now => Some(FilterValue::DateTime(now)),
            DefaultKind::Uuid => Some(FilterValue::String(Uuid::new_v4().to_string())),
            DefaultKind::Literal(text) => serde_json::from_str::<Value>(text)
                .ok()
                .map(|v| FilterValue::from_json(&v)),
            DefaultKind::None | DefaultKind::Autoincrement => None,
        };
        if let Some(value) = default {
            values.push((field, value));
        }
    }
    values
}

/// Assignments for one update input, refreshing `@updatedAt` fields the
/// caller left unset.
pub(crate) fn update_assignments(
    meta: &'static ModelMeta,
    input: Vec<(&'static str, Assignment)>,
) -> Vec<(&'static FieldMeta, Assignment)> {
    let mut assignments: Vec<(&'static FieldMeta, Assignment)> = input
        .into_iter()
        .filter_map(|(name, assignment)| meta.field(name).map(|f| (f, assignment)))
        .collect();
    if assignments.is_empty() {
        return assignments;
    }
    let now = Utc::now();
    for field in meta.fields.iter().filter(|f| f.updated_at) {
        if !assignments.iter().any(|(f, _)| f.name == field.name) {
            assignments.push((field, Assignment::Set(FilterValue::DateTime(now))));
        }
    }
    assignments
}

/// Load includes and counts, then drop the hidden join fields.
pub(crate) async fn finish<E: QueryEngine>(
    engine: &E,
    projection: &Projection,
    columns: &Columns,
    mut rows: Vec<Row>,
) -> QueryResult<Vec<Row>> {
    load_relations(engine, &mut rows, &projection.includes, &projection.counts).await?;
    for row in &mut rows {
        strip_hidden(row, &columns.hidden);
    }
    Ok(rows)
}

pub(crate) fn strip_hidden(row: &mut Row, hidden: &[&'static str]) {
    for name in hidden {
        row.remove(*name);
    }
}

/// Decode a row into `T`.
pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> QueryResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| QueryError::deserialization(e.to_string()))
}

pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> QueryResult<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// `select`, `omit` and `include` for an operation builder whose
/// [`Projection`] lives at `self.$field`.
macro_rules! projection_methods {
    ($($field:ident).+) => {
        /// Only return the given scalar fields.
        pub fn select(mut self, fields: impl IntoIterator<Item = M::ScalarField>) -> Self {
            self.$($field).+.select = Some(
                fields
                    .into_iter()
                    .map(|f| crate::traits::ScalarFieldEnum::meta(&f))
                    .collect(),
            );
            self
        }

        /// Leave the given scalar fields out of the result.
        pub fn omit(mut self, fields: impl IntoIterator<Item = M::ScalarField>) -> Self {
            self.$($field).+.omit.extend(
                fields
                    .into_iter()
                    .map(|f| crate::traits::ScalarFieldEnum::name(&f)),
            );
            self
        }

        /// Load a relation or a relation count with the result.
        pub fn include(mut self, include: impl Into<crate::relations::Include<M>>) -> Self {
            self.$($field).+.add(include.into().into_entry());
            self
        }
    };
}

pub(crate) use projection_methods;
