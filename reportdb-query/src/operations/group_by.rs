//! GroupBy operation: bucket records by a set of fields and aggregate every
//! bucket.
//!
//! Arguments are validated before any SQL is issued. Every `orderBy` and
//! `having` condition on a plain field must name a field of `by`, and
//! `skip`/`take` need an `orderBy`. Aggregate orderings and conditions may
//! use any field.
//!
//! # Example
//!
//! ```rust,ignore
//! let busiest = client
//!     .tweet()
//!     .group_by([tweet::ScalarField::TwitterUserId])
//!     .count_all()
//!     .avg(tweet::ScalarField::LikeCount)
//!     .having(Having::avg(tweet::ScalarField::LikeCount).gt(10))
//!     .order_by(OrderBy::aggregate(AggregateFn::Count, tweet::ScalarField::Id, SortOrder::Desc))
//!     .take(5)
//!     .exec()
//!     .await?;
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue, Where};
use crate::meta::{FieldMeta, ModelMeta};
use crate::pagination::Pagination;
use crate::sql::{Scope, SqlBuilder, Statement, quote_identifier};
use crate::traits::{Model, QueryEngine, Row, ScalarFieldEnum};
use crate::types::{AggregateFn, OrderBy, OrderSpec, OrderTarget, order_clause};

use super::aggregate::{Aggregations, check_numeric, nest_aggregates};
use super::{decode_all, push_where, select_list};

/// An untyped `having` condition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HavingExpr {
    /// Condition on grouped fields.
    Field(Filter),
    /// Comparison of an aggregate; `field: None` is `COUNT(*)`.
    Aggregate {
        func: AggregateFn,
        field: Option<&'static FieldMeta>,
        op: &'static str,
        value: FilterValue,
    },
    And(Vec<HavingExpr>),
    Or(Vec<HavingExpr>),
    Not(Box<HavingExpr>),
}

impl HavingExpr {
    fn to_sql(&self, scope: &Scope, b: &mut SqlBuilder) {
        match self {
            Self::Field(filter) => filter.to_sql(scope, b),
            Self::Aggregate { func, field, op, value } => {
                let target = field.map_or_else(|| "*".to_string(), |f| scope.column(f.column));
                b.push(format!("{}({})", func.as_sql(), target));
                match (*op, value.is_null()) {
                    ("=", true) => {
                        b.push(" IS NULL");
                    }
                    ("<>", true) => {
                        b.push(" IS NOT NULL");
                    }
                    _ => {
                        b.push(format!(" {} ", op)).push_param(value.clone());
                    }
                }
            }
            Self::And(items) | Self::Or(items) if items.is_empty() => {
                b.push(if matches!(self, Self::And(_)) { "TRUE" } else { "FALSE" });
            }
            Self::And(items) => {
                b.push("(");
                b.push_separated(items, " AND ", |b, item| item.to_sql(scope, b));
                b.push(")");
            }
            Self::Or(items) => {
                b.push("(");
                b.push_separated(items, " OR ", |b, item| item.to_sql(scope, b));
                b.push(")");
            }
            Self::Not(inner) => {
                b.push("NOT (");
                inner.to_sql(scope, b);
                b.push(")");
            }
        }
    }

    /// Check plain field conditions against the grouped columns and
    /// aggregate conditions against the field kinds.
    fn validate(&self, meta: &ModelMeta, by: &[&'static FieldMeta]) -> QueryResult<()> {
        match self {
            Self::Field(filter) => {
                if filter.has_relation() {
                    return Err(QueryError::validation(format!(
                        "`having` of {} group_by cannot filter on relations",
                        meta.name
                    ))
                    .with_model(meta.name));
                }
                for column in filter.columns() {
                    if !by.iter().any(|f| f.column == column) {
                        return Err(not_grouped(meta, "having", column));
                    }
                }
                Ok(())
            }
            Self::Aggregate { func, field, .. } => match field {
                Some(field) => check_numeric(meta, *func, field),
                None => Ok(()),
            },
            Self::And(items) | Self::Or(items) => items.iter().try_for_each(|item| item.validate(meta, by)),
            Self::Not(inner) => inner.validate(meta, by),
        }
    }
}

fn not_grouped(meta: &ModelMeta, argument: &str, field: &str) -> QueryError {
    QueryError::validation(format!(
        "every field used in `{}` of {} group_by must be listed in `by`; `{}` is not",
        argument, meta.name, field
    ))
    .with_model(meta.name)
    .with_field(field)
}

/// A `having` condition on model `M`.
pub struct Having<M> {
    expr: HavingExpr,
    _model: PhantomData<fn() -> M>,
}

impl<M> Having<M> {
    fn from_expr(expr: HavingExpr) -> Self {
        Self {
            expr,
            _model: PhantomData,
        }
    }

    /// A condition on grouped fields.
    pub fn field(condition: Where<M>) -> Self {
        Self::from_expr(HavingExpr::Field(condition.into_filter()))
    }

    /// Compare the number of records in the group.
    pub fn count_all() -> HavingAggregate<M> {
        HavingAggregate::new(AggregateFn::Count, None)
    }

    /// All conditions must hold.
    pub fn and(conditions: impl IntoIterator<Item = Having<M>>) -> Self {
        Self::from_expr(HavingExpr::And(conditions.into_iter().map(|h| h.expr).collect()))
    }

    /// At least one condition must hold.
    pub fn or(conditions: impl IntoIterator<Item = Having<M>>) -> Self {
        Self::from_expr(HavingExpr::Or(conditions.into_iter().map(|h| h.expr).collect()))
    }

    /// The condition must not hold.
    pub fn not(condition: Having<M>) -> Self {
        Self::from_expr(HavingExpr::Not(Box::new(condition.expr)))
    }
}

impl<M: Model> Having<M> {
    /// Compare the number of non-null values of a field.
    pub fn count(field: M::ScalarField) -> HavingAggregate<M> {
        HavingAggregate::new(AggregateFn::Count, Some(field.meta()))
    }

    /// Compare the average of a numeric field.
    pub fn avg(field: M::ScalarField) -> HavingAggregate<M> {
        HavingAggregate::new(AggregateFn::Avg, Some(field.meta()))
    }

    /// Compare the sum of a numeric field.
    pub fn sum(field: M::ScalarField) -> HavingAggregate<M> {
        HavingAggregate::new(AggregateFn::Sum, Some(field.meta()))
    }

    /// Compare the smallest value of a field.
    pub fn min(field: M::ScalarField) -> HavingAggregate<M> {
        HavingAggregate::new(AggregateFn::Min, Some(field.meta()))
    }

    /// Compare the largest value of a field.
    pub fn max(field: M::ScalarField) -> HavingAggregate<M> {
        HavingAggregate::new(AggregateFn::Max, Some(field.meta()))
    }
}

impl<M> std::fmt::Debug for Having<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Having").field(&self.expr).finish()
    }
}

/// An aggregate awaiting its comparison.
pub struct HavingAggregate<M> {
    func: AggregateFn,
    field: Option<&'static FieldMeta>,
    _model: PhantomData<fn() -> M>,
}

impl<M> HavingAggregate<M> {
    fn new(func: AggregateFn, field: Option<&'static FieldMeta>) -> Self {
        Self {
            func,
            field,
            _model: PhantomData,
        }
    }

    fn compare(self, op: &'static str, value: impl Into<FilterValue>) -> Having<M> {
        Having::from_expr(HavingExpr::Aggregate {
            func: self.func,
            field: self.field,
            op,
            value: value.into(),
        })
    }

    /// `= value`
    pub fn equals(self, value: impl Into<FilterValue>) -> Having<M> {
        self.compare("=", value)
    }

    /// `<> value`
    pub fn not(self, value: impl Into<FilterValue>) -> Having<M> {
        self.compare("<>", value)
    }

    /// `< value`
    pub fn lt(self, value: impl Into<FilterValue>) -> Having<M> {
        self.compare("<", value)
    }

    /// `<= value`
    pub fn lte(self, value: impl Into<FilterValue>) -> Having<M> {
        self.compare("<=", value)
    }

    /// `> value`
    pub fn gt(self, value: impl Into<FilterValue>) -> Having<M> {
        self.compare(">", value)
    }

    /// `>= value`
    pub fn gte(self, value: impl Into<FilterValue>) -> Having<M> {
        self.compare(">=", value)
    }
}

/// GroupBy operation builder.
pub struct GroupByOperation<E: QueryEngine, M: Model> {
    engine: E,
    by: Vec<&'static FieldMeta>,
    filter: Filter,
    having: Option<HavingExpr>,
    order_by: Vec<OrderSpec>,
    pagination: Pagination,
    aggregations: Aggregations,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> GroupByOperation<E, M> {
    /// Create a new GroupBy operation over the `by` fields.
    pub fn new(engine: E, by: impl IntoIterator<Item = M::ScalarField>) -> Self {
        let mut fields: Vec<&'static FieldMeta> = Vec::new();
        for field in by {
            let meta = field.meta();
            if !fields.contains(&meta) {
                fields.push(meta);
            }
        }
        Self {
            engine,
            by: fields,
            filter: Filter::None,
            having: None,
            order_by: Vec::new(),
            pagination: Pagination::new(),
            aggregations: Aggregations::default(),
            _model: PhantomData,
        }
    }

    /// Filter the records before grouping.
    pub fn r#where(mut self, filter: Where<M>) -> Self {
        self.filter = self.filter.and_then(filter.into_filter());
        self
    }

    /// Filter the groups.
    pub fn having(mut self, condition: Having<M>) -> Self {
        self.having = Some(match self.having.take() {
            None => condition.expr,
            Some(HavingExpr::And(mut items)) => {
                items.push(condition.expr);
                HavingExpr::And(items)
            }
            Some(existing) => HavingExpr::And(vec![existing, condition.expr]),
        });
        self
    }

    /// Order the groups by a grouped field or an aggregate.
    pub fn order_by(mut self, order: OrderBy<M>) -> Self {
        self.order_by.push(order.into_spec());
        self
    }

    /// Skip a number of groups.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Take a number of groups; negative values read backwards.
    pub fn take(mut self, n: i64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Count the records of each group (`_count._all`).
    pub fn count_all(mut self) -> Self {
        self.aggregations.count_all = true;
        self
    }

    /// Count the non-null values of a field per group.
    pub fn count(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Count, field.meta());
        self
    }

    /// Average of a numeric field per group.
    pub fn avg(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Avg, field.meta());
        self
    }

    /// Sum of a numeric field per group.
    pub fn sum(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Sum, field.meta());
        self
    }

    /// Smallest value of a field per group.
    pub fn min(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Min, field.meta());
        self
    }

    /// Largest value of a field per group.
    pub fn max(mut self, field: M::ScalarField) -> Self {
        self.aggregations.add(AggregateFn::Max, field.meta());
        self
    }

    /// Check the arguments without running anything.
    pub fn validate(&self) -> QueryResult<()> {
        let meta = M::meta();
        if self.by.is_empty() {
            return Err(
                QueryError::validation(format!("group_by on {} needs at least one `by` field", meta.name))
                    .with_model(meta.name),
            );
        }
        if !self.pagination.is_empty() && self.order_by.is_empty() {
            return Err(QueryError::validation(format!(
                "`skip` and `take` in group_by on {} need an `orderBy`",
                meta.name
            ))
            .with_model(meta.name));
        }
        for spec in &self.order_by {
            match &spec.target {
                OrderTarget::Field { field, .. } => {
                    if !self.by.iter().any(|f| f.name == *field) {
                        return Err(not_grouped(meta, "orderBy", field));
                    }
                }
                OrderTarget::Aggregate { func, field, .. } => {
                    if let Some(field) = meta.field(field) {
                        check_numeric(meta, *func, field)?;
                    }
                }
                OrderTarget::Relation { relation, .. } | OrderTarget::RelationCount { relation } => {
                    return Err(QueryError::validation(format!(
                        "group_by on {} cannot be ordered by relation `{}`",
                        meta.name, relation.name
                    ))
                    .with_model(meta.name));
                }
            }
        }
        if let Some(having) = &self.having {
            having.validate(meta, &self.by)?;
        }
        self.aggregations.validate(meta)
    }

    /// Validate and build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.validate()?;
        let meta = M::meta();
        let scope = Scope::root(meta.table);

        let mut items = vec![select_list(&self.by)];
        items.extend(self.aggregations.select_items(&scope));

        let mut builder = SqlBuilder::new();
        builder
            .push(format!("SELECT {} FROM ", items.join(", ")))
            .push(scope.from_clause());
        push_where(&mut builder, &scope, &self.filter, None);

        let grouped: Vec<String> = self.by.iter().map(|f| quote_identifier(f.column)).collect();
        builder.push(" GROUP BY ").push(grouped.join(", "));
        if let Some(having) = &self.having {
            builder.push(" HAVING ");
            having.to_sql(&scope, &mut builder);
        }

        let order: Vec<OrderSpec> = if self.pagination.is_backwards() {
            self.order_by.iter().map(OrderSpec::reversed).collect()
        } else {
            self.order_by.clone()
        };
        builder.push(order_clause(&order, &scope));
        let page = self.pagination.to_sql();
        if !page.is_empty() {
            builder.push(" ").push(page);
        }
        Ok(builder.build())
    }

    /// Execute the query and return one nested row per group.
    pub async fn exec(self) -> QueryResult<Vec<Row>> {
        let statement = self.build_sql()?;
        debug!(model = M::MODEL_NAME, sql = %statement.sql, "Grouping records");
        let mut rows = self.engine.query(&statement.sql, statement.params).await?;
        if self.pagination.is_backwards() {
            rows.reverse();
        }
        rows.into_iter().map(nest_aggregates).collect()
    }

    /// Execute the query and decode every group into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<Vec<T>> {
        decode_all(self.exec().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    use crate::error::ErrorKind;
    use crate::fields::StringField;
    use crate::relations::RelationField;
    use crate::test_models::{Post, User, post};
    use crate::testing::MockEngine;
    use crate::types::SortOrder;

    fn by_author(engine: &MockEngine) -> GroupByOperation<MockEngine, Post> {
        GroupByOperation::new(engine.clone(), [post::ScalarField::CreatedById])
    }

    fn assert_rejected(op: GroupByOperation<MockEngine, Post>) {
        let err = op.build_sql().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    // ==========================================================================
    // Validation
    // ==========================================================================

    #[test]
    fn test_empty_by_is_rejected() {
        let engine = MockEngine::new();
        assert_rejected(GroupByOperation::new(engine, Vec::<post::ScalarField>::new()).count_all());
    }

    #[test]
    fn test_take_without_order_by_is_rejected() {
        let engine = MockEngine::new();
        assert_rejected(by_author(&engine).take(3));
        assert_rejected(by_author(&engine).skip(1));
    }

    #[test]
    fn test_order_by_field_outside_by_is_rejected() {
        let engine = MockEngine::new();
        assert_rejected(by_author(&engine).order_by(OrderBy::asc(post::ScalarField::Name)));

        // Aggregate orderings may use any field.
        let statement = by_author(&engine)
            .order_by(OrderBy::aggregate(AggregateFn::Count, post::ScalarField::Name, SortOrder::Desc))
            .build_sql();
        assert!(statement.is_ok());
    }

    #[test]
    fn test_order_by_relation_is_rejected() {
        let engine = MockEngine::new();
        let created_by = RelationField::<Post, User>::new(&post::CREATED_BY);
        let by_name = OrderBy::asc(crate::test_models::user::ScalarField::Name);
        assert_rejected(by_author(&engine).order_by(created_by.order_by(by_name)));
    }

    #[test]
    fn test_having_field_outside_by_is_rejected() {
        let engine = MockEngine::new();
        let name = StringField::<Post>::new("name");
        assert_rejected(by_author(&engine).having(Having::field(name.equals("x"))));

        let author = StringField::<Post>::new("createdById");
        assert!(by_author(&engine)
            .having(Having::field(author.equals("u1")))
            .build_sql()
            .is_ok());
    }

    #[test]
    fn test_having_relation_filter_is_rejected() {
        let engine = MockEngine::new();
        let created_by = RelationField::<Post, User>::new(&post::CREATED_BY);
        let user_name = StringField::<User>::new("name");
        assert_rejected(by_author(&engine).having(Having::field(created_by.is(user_name.equals("ada")))));

        let author = StringField::<Post>::new("createdById");
        let mixed = Where::and([author.equals("u1"), created_by.is(user_name.equals("ada"))]);
        assert_rejected(by_author(&engine).having(Having::field(mixed)));
    }

    #[test]
    fn test_non_numeric_aggregates_are_rejected() {
        let engine = MockEngine::new();
        assert_rejected(by_author(&engine).sum(post::ScalarField::Name));
        assert_rejected(by_author(&engine).having(Having::avg(post::ScalarField::Name).gt(1)));
        assert_rejected(by_author(&engine).order_by(OrderBy::aggregate(
            AggregateFn::Avg,
            post::ScalarField::CreatedAt,
            SortOrder::Asc,
        )));
    }

    // ==========================================================================
    // SQL
    // ==========================================================================

    #[test]
    fn test_group_by_sql() {
        let engine = MockEngine::new();
        let name = StringField::<Post>::new("name");
        let statement = by_author(&engine)
            .r#where(name.contains("rust"))
            .count_all()
            .max(post::ScalarField::CreatedAt)
            .having(Having::count_all().gte(2))
            .having(Having::avg(post::ScalarField::Id).lt(100))
            .order_by(OrderBy::aggregate(AggregateFn::Count, post::ScalarField::Id, SortOrder::Desc))
            .take(5)
            .build_sql()
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT \"createdById\", COUNT(*) AS \"_count._all\", MAX(\"createdAt\") AS \"_max.createdAt\" \
             FROM \"Post\" WHERE \"name\" LIKE $1 GROUP BY \"createdById\" \
             HAVING (COUNT(*) >= $2 AND AVG(\"id\") < $3) \
             ORDER BY COUNT(\"id\") DESC LIMIT 5"
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_having_composition() {
        let engine = MockEngine::new();
        let statement = by_author(&engine)
            .having(Having::or([
                Having::count_all().equals(1),
                Having::not(Having::max(post::ScalarField::Name).equals(FilterValue::Null)),
            ]))
            .build_sql()
            .unwrap();
        assert!(statement
            .sql
            .ends_with("HAVING (COUNT(*) = $1 OR NOT (MAX(\"name\") IS NULL))"));
    }

    // ==========================================================================
    // Execution
    // ==========================================================================

    #[tokio::test]
    async fn test_group_by_exec() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct ByAuthor {
            created_by_id: String,
            #[serde(rename = "_count")]
            _count: AllCount,
        }
        #[derive(Debug, Deserialize, PartialEq)]
        struct AllCount {
            _all: i64,
        }

        let engine = MockEngine::new();
        engine.push_rows([
            json!({"createdById": "u1", "_count._all": 2}),
            json!({"createdById": "u2", "_count._all": "1"}),
        ]);
        let groups: Vec<ByAuthor> = by_author(&engine).count_all().exec_as().await.unwrap();
        assert_eq!(
            groups,
            vec![
                ByAuthor {
                    created_by_id: "u1".into(),
                    _count: AllCount { _all: 2 },
                },
                ByAuthor {
                    created_by_id: "u2".into(),
                    _count: AllCount { _all: 1 },
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_group_by_runs_no_query() {
        let engine = MockEngine::new();
        let result = by_author(&engine).take(1).exec().await;
        assert!(result.is_err());
        assert!(engine.statements().is_empty());
    }
}
