//! Aggregate operation: `_count`, `_avg`, `_sum`, `_min` and `_max` over
//! the records matching a query.
//!
//! Results are nested the way the client returns them:
//!
//! ```json
//! { "_count": { "_all": 12, "likeCount": 12 }, "_avg": { "likeCount": 4.5 } }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let stats = client
//!     .tweet()
//!     .aggregate()
//!     .r#where(tweet::twitter_user_id::equals(user_id))
//!     .count_all()
//!     .avg(tweet::ScalarField::LikeCount)
//!     .max(tweet::ScalarField::TweetedAt)
//!     .exec()
//!     .await?;
//!
//! let average = stats.avg("likeCount");
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::Where;
use crate::meta::{FieldMeta, ModelMeta};
use crate::sql::{Scope, SqlBuilder, Statement, quote_identifier};
use crate::traits::{Model, QueryEngine, Row, ScalarFieldEnum, UniqueFilter};
use crate::types::{AggregateFn, OrderBy};

use super::ReadArgs;
use super::count::count_value;

/// Key of the row count inside `_count`.
pub const COUNT_ALL: &str = "_all";

/// The aggregates requested by `aggregate` or `group_by`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Aggregations {
    pub count_all: bool,
    pub items: Vec<(AggregateFn, &'static FieldMeta)>,
}

impl Aggregations {
    pub fn add(&mut self, func: AggregateFn, field: &'static FieldMeta) {
        if !self.items.contains(&(func, field)) {
            self.items.push((func, field));
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.count_all && self.items.is_empty()
    }

    /// Reject `_avg`/`_sum` on non-numeric fields.
    pub fn validate(&self, meta: &ModelMeta) -> QueryResult<()> {
        for (func, field) in &self.items {
            check_numeric(meta, *func, field)?;
        }
        Ok(())
    }

    /// Render `COUNT(*) AS "_count._all", AVG("col") AS "_avg.field", …`.
    pub fn select_items(&self, scope: &Scope) -> Vec<String> {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        if self.count_all {
            items.push(format!(
                "COUNT(*) AS {}",
                quote_identifier(&format!("{}.{}", AggregateFn::Count.key(), COUNT_ALL))
            ));
        }
        for (func, field) in &self.items {
            items.push(format!(
                "{}({}) AS {}",
                func.as_sql(),
                scope.column(field.column),
                quote_identifier(&format!("{}.{}", func.key(), field.name))
            ));
        }
        items
    }
}

pub(crate) fn check_numeric(meta: &ModelMeta, func: AggregateFn, field: &FieldMeta) -> QueryResult<()> {
    if func.requires_numeric() && !field.kind.is_numeric() {
        return Err(QueryError::validation(format!(
            "`{}` is not available on {}.{} of type {:?}",
            func.key(),
            meta.name,
            field.name,
            field.kind
        ))
        .with_model(meta.name)
        .with_field(field.name));
    }
    Ok(())
}

/// Fold `"_avg.likeCount"` style keys into nested objects.
///
/// `_count` values are read as integers; the other keys are left as the
/// database returned them.
pub(crate) fn nest_aggregates(row: Row) -> QueryResult<Row> {
    let mut nested = Map::new();
    for (key, value) in row {
        let Some((group, field)) = key.split_once('.').filter(|(g, _)| g.starts_with('_')) else {
            nested.insert(key, value);
            continue;
        };
        let value = if group == AggregateFn::Count.key() {
            Value::from(count_value(&value)?)
        } else {
            value
        };
        let entry = nested
            .entry(group.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(fields) = entry {
            fields.insert(field.to_string(), value);
        }
    }
    Ok(nested)
}

/// The result of an `aggregate` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRow(Row);

impl AggregateRow {
    /// Wrap an already nested row.
    pub fn new(row: Row) -> Self {
        Self(row)
    }

    /// The value of `func` over `field`, if requested.
    pub fn get(&self, func: AggregateFn, field: &str) -> Option<&Value> {
        self.0.get(func.key())?.get(field)
    }

    /// Number of matching records, when `count_all` was requested.
    pub fn count_all(&self) -> Option<i64> {
        self.get(AggregateFn::Count, COUNT_ALL)?.as_i64()
    }

    /// Number of non-null values of `field`.
    pub fn count(&self, field: &str) -> Option<i64> {
        self.get(AggregateFn::Count, field)?.as_i64()
    }

    /// Average of `field`; `None` when requested over no rows.
    pub fn avg(&self, field: &str) -> Option<f64> {
        number(self.get(AggregateFn::Avg, field)?)
    }

    /// Sum of `field`; `None` when requested over no rows.
    pub fn sum(&self, field: &str) -> Option<f64> {
        number(self.get(AggregateFn::Sum, field)?)
    }

    /// Smallest value of `field`.
    pub fn min(&self, field: &str) -> Option<&Value> {
        self.get(AggregateFn::Min, field).filter(|v| !v.is_null())
    }

    /// Largest value of `field`.
    pub fn max(&self, field: &str) -> Option<&Value> {
        self.get(AggregateFn::Max, field).filter(|v| !v.is_null())
    }

    /// The nested result object.
    pub fn as_row(&self) -> &Row {
        &self.0
    }

    /// Decode into a caller-chosen shape.
    pub fn decode<T: DeserializeOwned>(self) -> QueryResult<T> {
        super::decode(self.0)
    }
}

/// `NUMERIC` results often arrive as text.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Aggregate operation builder.
pub struct AggregateOperation<E: QueryEngine, M: Model> {
    engine: E,
    args: ReadArgs,
    aggregations: Aggregations,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> AggregateOperation<E, M> {
    /// Create a new Aggregate operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            args: ReadArgs::default(),
            aggregations: Aggregations::default(),
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: Where<M>) -> Self {
        self.args.filter = self.args.filter.and_then(filter.into_filter());
        self
    }

    /// Order the records before the page is cut.
    pub fn order_by(mut self, order: OrderBy<M>) -> Self {
        self.args.order_by.push(order.into_spec());
        self
    }

    /// Start at the record identified by `cursor` (inclusive).
    pub fn cursor(mut self, cursor: M::UniqueWhere) -> Self {
        self.args.cursor = Some(cursor.into_filter());
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.args.pagination = self.args.pagination.skip(n);
        self
    }

    /// Aggregate over at most `|n|` records; negative values read backwards.
    pub fn take(mut self, n: i64) -> Self {
        self.args.pagination = self.args.pagination.take(n);
        self
    }

    /// Count the matching records (`_count._all`).
    pub fn count_all(mut self) -> Self {
        self.aggregations.count_all = true;
        self
    }

    /// Count the non-null values of a field.
    pub fn count(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Count, field.meta());
        self
    }

    /// Average of a numeric field.
    pub fn avg(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Avg, field.meta());
        self
    }

    /// Sum of a numeric field.
    pub fn sum(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Sum, field.meta());
        self
    }

    /// Smallest value of a field.
    pub fn min(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Min, field.meta());
        self
    }

    /// Largest value of a field.
    pub fn max(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Max, field.meta());
        self
    }

    /// Build the SQL query; `None` when nothing was requested.
    pub fn build_sql(&self) -> QueryResult<Option<Statement>> {
        let meta = M::meta();
        self.aggregations.validate(meta)?;
        if self.aggregations.is_empty() {
            return Ok(None);
        }

        let items = self.aggregations.select_items(&Scope::root(meta.table)).join(", ");
        let mut builder = SqlBuilder::new();
        if self.args.is_paged() {
            builder.push(format!("SELECT {} FROM (", items));
            self.args.push_select(&mut builder, meta, "*");
            builder.push(") AS \"sub\"");
        } else {
            let args = ReadArgs {
                filter: self.args.filter.clone(),
                ..Default::default()
            };
            args.push_select(&mut builder, meta, &items);
        }
        Ok(Some(builder.build()))
    }

    /// Execute the aggregation.
    pub async fn exec(self) -> QueryResult<AggregateRow> {
        let Some(statement) = self.build_sql()? else {
            return Ok(AggregateRow::default());
        };
        debug!(model = M::MODEL_NAME, sql = %statement.sql, "Aggregating records");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        let row = rows.into_iter().next().unwrap_or_default();
        nest_aggregates(row).map(AggregateRow::new)
    }

    /// Execute the aggregation and decode the nested result into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<T> {
        self.exec().await?.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    use crate::fields::StringField;
    use crate::test_models::{Post, post};
    use crate::testing::MockEngine;

    fn aggregate(engine: &MockEngine) -> AggregateOperation<MockEngine, Post> {
        AggregateOperation::new(engine.clone())
    }

    // ==========================================================================
    // SQL
    // ==========================================================================

    #[test]
    fn test_aggregate_sql() {
        let engine = MockEngine::new();
        let name = StringField::<Post>::new("name");
        let statement = aggregate(&engine)
            .r#where(name.starts_with("a"))
            .count_all()
            .avg(post::ScalarField::Id)
            .max(post::ScalarField::CreatedAt)
            .build_sql()
            .unwrap()
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) AS \"_count._all\", AVG(\"id\") AS \"_avg.id\", \
             MAX(\"createdAt\") AS \"_max.createdAt\" FROM \"Post\" WHERE \"name\" LIKE $1"
        );
    }

    #[test]
    fn test_aggregate_page_uses_subquery() {
        let engine = MockEngine::new();
        let statement = aggregate(&engine)
            .order_by(OrderBy::desc(post::ScalarField::CreatedAt))
            .take(10)
            .sum(post::ScalarField::Id)
            .build_sql()
            .unwrap()
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT SUM(\"id\") AS \"_sum.id\" FROM (SELECT * FROM \"Post\" \
             ORDER BY \"createdAt\" DESC LIMIT 10) AS \"sub\""
        );
    }

    #[test]
    fn test_aggregate_rejects_non_numeric_avg() {
        let engine = MockEngine::new();
        let err = aggregate(&engine).avg(post::ScalarField::Name).build_sql().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.code.code(), "P2009");
    }

    // ==========================================================================
    // Execution
    // ==========================================================================

    #[tokio::test]
    async fn test_aggregate_exec_nests_results() {
        let engine = MockEngine::new();
        engine.push_rows([json!({
            "_count._all": 3,
            "_avg.id": "2.0000000000000000",
            "_min.name": "a",
            "_max.name": null
        })]);
        let row = aggregate(&engine)
            .count_all()
            .avg(post::ScalarField::Id)
            .min(post::ScalarField::Name)
            .max(post::ScalarField::Name)
            .exec()
            .await
            .unwrap();

        assert_eq!(row.count_all(), Some(3));
        assert_eq!(row.avg("id"), Some(2.0));
        assert_eq!(row.min("name"), Some(&json!("a")));
        assert_eq!(row.max("name"), None);
        assert_eq!(row.as_row()["_count"], json!({"_all": 3}));
    }

    #[tokio::test]
    async fn test_aggregate_exec_as() {
        #[derive(Deserialize)]
        struct Counts {
            _count: CountAll,
        }
        #[derive(Deserialize)]
        struct CountAll {
            _all: i64,
        }

        let engine = MockEngine::new();
        engine.push_rows([json!({"_count._all": "5"})]);
        let counts: Counts = aggregate(&engine).count_all().exec_as().await.unwrap();
        assert_eq!(counts._count._all, 5);
    }

    #[tokio::test]
    async fn test_empty_aggregate_runs_no_query() {
        let engine = MockEngine::new();
        let row = aggregate(&engine).exec().await.unwrap();
        assert!(row.as_row().is_empty());
        assert!(engine.statements().is_empty());
    }

    #[test]
    fn test_nest_aggregates_keeps_plain_keys() {
        let row = json!({"name": "x", "_count.id": 2, "_sum.id": 10})
            .as_object()
            .unwrap()
            .clone();
        let nested = nest_aggregates(row).unwrap();
        assert_eq!(
            Value::Object(nested),
            json!({"name": "x", "_count": {"id": 2}, "_sum": {"id": 10}})
        );
    }
}
