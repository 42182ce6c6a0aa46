//! Ordering types.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::meta::RelationMeta;
use crate::relations::join_condition;
use crate::sql::Scope;
use crate::traits::{Model, ScalarFieldEnum};

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// The opposite direction.
    pub fn reverse(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Null handling in sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Nulls appear first in the results.
    First,
    /// Nulls appear last in the results.
    Last,
}

impl NullsOrder {
    /// Get the SQL clause for this null order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }

    /// The opposite placement.
    pub fn reverse(&self) -> Self {
        match self {
            Self::First => Self::Last,
            Self::Last => Self::First,
        }
    }
}

/// Aggregate functions available to `aggregate`, `group_by` and `having`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    /// `COUNT`
    Count,
    /// `AVG`
    Avg,
    /// `SUM`
    Sum,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
}

impl AggregateFn {
    /// SQL function name.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Avg => "AVG",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Key of the aggregate in result objects (`_count`, `_avg`, …).
    pub fn key(&self) -> &'static str {
        match self {
            Self::Count => "_count",
            Self::Avg => "_avg",
            Self::Sum => "_sum",
            Self::Min => "_min",
            Self::Max => "_max",
        }
    }

    /// Whether the function only applies to numeric fields.
    pub fn requires_numeric(&self) -> bool {
        matches!(self, Self::Avg | Self::Sum)
    }
}

/// What an ordering sorts by.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    /// A scalar field of the queried model.
    Field {
        /// Field name.
        field: &'static str,
        /// Column name.
        column: &'static str,
    },
    /// A field reached through a to-one relation.
    Relation {
        /// The relation followed.
        relation: &'static RelationMeta,
        /// Ordering on the related model.
        inner: Box<OrderSpec>,
    },
    /// The number of records in a list relation.
    RelationCount {
        /// The list relation counted.
        relation: &'static RelationMeta,
    },
    /// An aggregate over a field (group-by only).
    Aggregate {
        /// The aggregate function.
        func: AggregateFn,
        /// Field name.
        field: &'static str,
        /// Column name.
        column: &'static str,
    },
}

/// An untyped ordering entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    /// What to sort by.
    pub target: OrderTarget,
    /// Direction.
    pub order: SortOrder,
    /// Null placement.
    pub nulls: Option<NullsOrder>,
}

impl OrderSpec {
    /// The same ordering in the opposite direction.
    pub fn reversed(&self) -> Self {
        let target = match &self.target {
            OrderTarget::Relation { relation, inner } => OrderTarget::Relation {
                relation,
                inner: Box::new(inner.reversed()),
            },
            other => other.clone(),
        };
        Self {
            target,
            order: self.order.reverse(),
            nulls: self.nulls.map(|n| n.reverse()),
        }
    }

    /// The field name when ordering by a plain scalar field.
    pub fn scalar_field(&self) -> Option<&'static str> {
        match self.target {
            OrderTarget::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Render `expr ASC [NULLS …]`.
    pub fn to_sql(&self, scope: &Scope) -> String {
        let mut sql = self.expression(scope);
        sql.push(' ');
        sql.push_str(self.order.as_sql());
        if let Some(nulls) = self.nulls {
            sql.push(' ');
            sql.push_str(nulls.as_sql());
        }
        sql
    }

    fn expression(&self, scope: &Scope) -> String {
        match &self.target {
            OrderTarget::Field { column, .. } => scope.column(column),
            OrderTarget::Relation { relation, inner } => {
                let nested = scope.nested(relation.target.table);
                format!(
                    "(SELECT {} FROM {} WHERE {} LIMIT 1)",
                    inner.expression(&nested),
                    nested.from_clause(),
                    join_condition(relation, scope, &nested)
                )
            }
            OrderTarget::RelationCount { relation } => {
                let nested = scope.nested(relation.target.table);
                format!(
                    "(SELECT COUNT(*) FROM {} WHERE {})",
                    nested.from_clause(),
                    join_condition(relation, scope, &nested)
                )
            }
            OrderTarget::Aggregate { func, column, .. } => {
                format!("{}({})", func.as_sql(), scope.column(column))
            }
        }
    }
}

/// An ordering entry on model `M`.
pub struct OrderBy<M> {
    spec: OrderSpec,
    _model: PhantomData<fn() -> M>,
}

impl<M> OrderBy<M> {
    fn from_spec(spec: OrderSpec) -> Self {
        Self {
            spec,
            _model: PhantomData,
        }
    }

    /// Place nulls first.
    pub fn nulls_first(mut self) -> Self {
        self.spec.nulls = Some(NullsOrder::First);
        self
    }

    /// Place nulls last.
    pub fn nulls_last(mut self) -> Self {
        self.spec.nulls = Some(NullsOrder::Last);
        self
    }

    /// Order by a field of a to-one related model.
    pub fn relation<T>(relation: &'static RelationMeta, inner: OrderBy<T>) -> Self {
        let order = inner.spec.order;
        Self::from_spec(OrderSpec {
            target: OrderTarget::Relation {
                relation,
                inner: Box::new(inner.spec),
            },
            order,
            nulls: None,
        })
    }

    /// Order by the number of records in a list relation.
    pub fn relation_count(relation: &'static RelationMeta, order: SortOrder) -> Self {
        Self::from_spec(OrderSpec {
            target: OrderTarget::RelationCount { relation },
            order,
            nulls: None,
        })
    }

    /// The untyped ordering.
    pub fn spec(&self) -> &OrderSpec {
        &self.spec
    }

    /// Unwrap the untyped ordering.
    pub fn into_spec(self) -> OrderSpec {
        self.spec
    }
}

impl<M: Model> OrderBy<M> {
    /// Order by a scalar field.
    pub fn new(field: M::ScalarField, order: SortOrder) -> Self {
        Self::from_spec(OrderSpec {
            target: OrderTarget::Field {
                field: field.name(),
                column: field.column(),
            },
            order,
            nulls: None,
        })
    }

    /// Ascending by a scalar field.
    pub fn asc(field: M::ScalarField) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    /// Descending by a scalar field.
    pub fn desc(field: M::ScalarField) -> Self {
        Self::new(field, SortOrder::Desc)
    }

    /// Order groups by an aggregate (`_count(id) desc`).
    pub fn aggregate(func: AggregateFn, field: M::ScalarField, order: SortOrder) -> Self {
        Self::from_spec(OrderSpec {
            target: OrderTarget::Aggregate {
                func,
                field: field.name(),
                column: field.column(),
            },
            order,
            nulls: None,
        })
    }
}

impl<M> Clone for OrderBy<M> {
    fn clone(&self) -> Self {
        Self::from_spec(self.spec.clone())
    }
}

impl<M> fmt::Debug for OrderBy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderBy").field(&self.spec).finish()
    }
}

/// Render an `ORDER BY` clause (with leading space) or nothing.
pub(crate) fn order_clause(specs: &[OrderSpec], scope: &Scope) -> String {
    if specs.is_empty() {
        return String::new();
    }
    let parts: Vec<_> = specs.iter().map(|s| s.to_sql(scope)).collect();
    format!(" ORDER BY {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::test_models::{Post, User, post, user};

    #[test]
    fn test_sort_order_sql() {
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
        assert_eq!(SortOrder::Desc.to_string(), "DESC");
        assert_eq!(SortOrder::Asc.reverse(), SortOrder::Desc);
        assert_eq!(NullsOrder::First.as_sql(), "NULLS FIRST");
    }

    #[test]
    fn test_field_order() {
        let order = OrderBy::<User>::desc(user::ScalarField::Name).nulls_last();
        assert_eq!(
            order.spec().to_sql(&Scope::root("User")),
            "\"name\" DESC NULLS LAST"
        );
        assert_eq!(order.spec().scalar_field(), Some("name"));
    }

    #[test]
    fn test_reversed_flips_direction_and_nulls() {
        let order = OrderBy::<User>::asc(user::ScalarField::Name).nulls_first();
        let reversed = order.spec().reversed();
        assert_eq!(reversed.order, SortOrder::Desc);
        assert_eq!(reversed.nulls, Some(NullsOrder::Last));
    }

    #[test]
    fn test_relation_order() {
        let created_by = post::META.relation("createdBy").unwrap();
        let order = OrderBy::<Post>::relation(created_by, OrderBy::<User>::asc(user::ScalarField::Name));
        assert_eq!(
            order.spec().to_sql(&Scope::root("Post")),
            "(SELECT \"r1\".\"name\" FROM \"User\" AS \"r1\" WHERE \"r1\".\"id\" = \"Post\".\"createdById\" LIMIT 1) ASC"
        );
        assert_eq!(order.spec().scalar_field(), None);
    }

    #[test]
    fn test_relation_count_order() {
        let posts = user::META.relation("posts").unwrap();
        let order = OrderBy::<User>::relation_count(posts, SortOrder::Desc);
        assert_eq!(
            order.spec().to_sql(&Scope::root("User")),
            "(SELECT COUNT(*) FROM \"Post\" AS \"r1\" WHERE \"r1\".\"createdById\" = \"User\".\"id\") DESC"
        );
    }

    #[test]
    fn test_aggregate_order() {
        let order = OrderBy::<Post>::aggregate(AggregateFn::Count, post::ScalarField::Id, SortOrder::Desc);
        assert_eq!(order.spec().to_sql(&Scope::root("Post")), "COUNT(\"id\") DESC");
    }

    #[test]
    fn test_order_clause() {
        let specs = vec![
            OrderBy::<Post>::desc(post::ScalarField::CreatedAt).into_spec(),
            OrderBy::<Post>::asc(post::ScalarField::Id).into_spec(),
        ];
        assert_eq!(
            order_clause(&specs, &Scope::root("Post")),
            " ORDER BY \"createdAt\" DESC, \"id\" ASC"
        );
        assert_eq!(order_clause(&[], &Scope::root("Post")), "");
    }
}
