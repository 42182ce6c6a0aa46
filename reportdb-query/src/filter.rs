//! Filter types for building WHERE clauses.
//!
//! A [`Filter`] is an untyped tree over column names. Generated code never
//! builds one directly; it goes through the model-typed [`Where`] wrapper so
//! that conditions on one model cannot be passed to another model's query.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::meta::RelationMeta;
use crate::relations::join_condition;
use crate::sql::{Scope, SqlBuilder, Statement, escape_like};

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Timestamp value.
    DateTime(DateTime<Utc>),
    /// JSON document.
    Json(Value),
    /// List of values (arrays, e.g. a JSON path).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert a value read from a result row.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    /// Convert to the JSON representation used in result rows.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339()),
            Self::Json(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Operation on a JSON column, optionally at a path inside the document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonFilter {
    /// Keys (or array indexes) leading to the compared value.
    pub path: Vec<String>,
    /// The comparison.
    pub op: JsonOp,
}

/// JSON comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonOp {
    /// Value equals the document.
    Equals(Value),
    /// Value differs from the document.
    Not(Value),
    /// String value contains the text.
    StringContains(String),
    /// String value starts with the text.
    StringStartsWith(String),
    /// String value ends with the text.
    StringEndsWith(String),
    /// Array value contains the element(s).
    ArrayContains(Value),
}

/// How a relation filter quantifies over related records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationFilterKind {
    /// At least one related record matches.
    Some,
    /// All related records match.
    Every,
    /// No related record matches.
    None,
    /// The related record exists and matches.
    Is,
    /// The related record is missing or does not match.
    IsNot,
}

/// A complete filter that can be rendered to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison; `Null` renders as `IS NULL`.
    Equals(String, FilterValue),
    /// Not equals comparison; `Null` renders as `IS NOT NULL`.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(String, Vec<FilterValue>),
    /// Row value in a list of tuples (composite keys).
    RowIn(Vec<String>, Vec<Vec<FilterValue>>),

    /// Contains (LIKE %value%).
    Contains(String, FilterValue),
    /// Starts with (LIKE value%).
    StartsWith(String, FilterValue),
    /// Ends with (LIKE %value).
    EndsWith(String, FilterValue),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Case-insensitive comparison of the inner filter.
    Insensitive(Box<Filter>),
    /// JSON path/document comparison.
    Json(String, JsonFilter),
    /// Condition on related records.
    Relation {
        /// Quantifier.
        kind: RelationFilterKind,
        /// The relation being followed.
        relation: &'static RelationMeta,
        /// Condition on the related model.
        filter: Box<Filter>,
    },

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Wrap this filter in case-insensitive mode.
    pub fn insensitive(self) -> Self {
        Self::Insensitive(Box::new(self))
    }

    /// Columns of the filtered table this filter reads. Columns inside
    /// relation filters belong to another table and are not reported.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    /// Whether any part of this filter follows a relation.
    pub fn has_relation(&self) -> bool {
        match self {
            Self::Relation { .. } => true,
            Self::Insensitive(inner) | Self::Not(inner) => inner.has_relation(),
            Self::And(filters) | Self::Or(filters) => filters.iter().any(Filter::has_relation),
            _ => false,
        }
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::None | Self::Relation { .. } => {}
            Self::Equals(col, _)
            | Self::NotEquals(col, _)
            | Self::Lt(col, _)
            | Self::Lte(col, _)
            | Self::Gt(col, _)
            | Self::Gte(col, _)
            | Self::In(col, _)
            | Self::NotIn(col, _)
            | Self::Contains(col, _)
            | Self::StartsWith(col, _)
            | Self::EndsWith(col, _)
            | Self::IsNull(col)
            | Self::IsNotNull(col)
            | Self::Json(col, _) => out.push(col),
            Self::RowIn(cols, _) => out.extend(cols.iter().map(String::as_str)),
            Self::Insensitive(inner) | Self::Not(inner) => inner.collect_columns(out),
            Self::And(filters) | Self::Or(filters) => {
                filters.iter().for_each(|f| f.collect_columns(out))
            }
        }
    }

    /// Render into `builder` with columns resolved against `scope`.
    pub fn to_sql(&self, scope: &Scope, builder: &mut SqlBuilder) {
        self.render(scope, builder, false);
    }

    /// Render as a standalone condition on `table`.
    pub fn to_statement(&self, table: &'static str) -> Statement {
        let mut builder = SqlBuilder::new();
        self.to_sql(&Scope::root(table), &mut builder);
        builder.build()
    }

    fn render(&self, scope: &Scope, b: &mut SqlBuilder, insensitive: bool) {
        match self {
            Self::None => {
                b.push("TRUE");
            }

            Self::Equals(col, val) => {
                if val.is_null() {
                    b.push(format!("{} IS NULL", scope.column(col)));
                } else {
                    compare(b, scope, col, "=", val, insensitive);
                }
            }
            Self::NotEquals(col, val) => {
                if val.is_null() {
                    b.push(format!("{} IS NOT NULL", scope.column(col)));
                } else {
                    compare(b, scope, col, "<>", val, insensitive);
                }
            }
            Self::Lt(col, val) => compare(b, scope, col, "<", val, false),
            Self::Lte(col, val) => compare(b, scope, col, "<=", val, false),
            Self::Gt(col, val) => compare(b, scope, col, ">", val, false),
            Self::Gte(col, val) => compare(b, scope, col, ">=", val, false),

            Self::In(col, values) => {
                if values.is_empty() {
                    b.push("FALSE");
                } else {
                    in_list(b, scope, col, "IN", values, insensitive);
                }
            }
            Self::NotIn(col, values) => {
                if values.is_empty() {
                    b.push("TRUE");
                } else {
                    in_list(b, scope, col, "NOT IN", values, insensitive);
                }
            }
            Self::RowIn(cols, rows) => {
                if rows.is_empty() || cols.is_empty() {
                    b.push("FALSE");
                } else if cols.len() == 1 {
                    let values: Vec<_> = rows.iter().filter_map(|r| r.first().cloned()).collect();
                    in_list(b, scope, &cols[0], "IN", &values, false);
                } else {
                    b.push("(");
                    b.push_separated(cols, ", ", |b, c| {
                        b.push(scope.column(c));
                    });
                    b.push(") IN (");
                    b.push_separated(rows, ", ", |b, row| {
                        b.push("(");
                        b.push_separated(row.iter().cloned(), ", ", |b, v| {
                            b.push_param(v);
                        });
                        b.push(")");
                    });
                    b.push(")");
                }
            }

            Self::Contains(col, val) => like(b, scope, col, val, "%", "%", insensitive),
            Self::StartsWith(col, val) => like(b, scope, col, val, "", "%", insensitive),
            Self::EndsWith(col, val) => like(b, scope, col, val, "%", "", insensitive),

            Self::IsNull(col) => {
                b.push(format!("{} IS NULL", scope.column(col)));
            }
            Self::IsNotNull(col) => {
                b.push(format!("{} IS NOT NULL", scope.column(col)));
            }

            Self::Insensitive(inner) => inner.render(scope, b, true),
            Self::Json(col, filter) => render_json(b, scope, col, filter),
            Self::Relation {
                kind,
                relation,
                filter,
            } => render_relation(b, scope, *kind, relation, filter),

            Self::And(filters) => {
                if filters.is_empty() {
                    b.push("TRUE");
                    return;
                }
                b.push("(");
                b.push_separated(filters, " AND ", |b, f| f.render(scope, b, insensitive));
                b.push(")");
            }
            Self::Or(filters) => {
                if filters.is_empty() {
                    b.push("FALSE");
                    return;
                }
                b.push("(");
                b.push_separated(filters, " OR ", |b, f| f.render(scope, b, insensitive));
                b.push(")");
            }
            Self::Not(filter) => {
                b.push("NOT (");
                filter.render(scope, b, insensitive);
                b.push(")");
            }
        }
    }
}

fn compare(
    b: &mut SqlBuilder,
    scope: &Scope,
    col: &str,
    op: &str,
    val: &FilterValue,
    insensitive: bool,
) {
    if insensitive {
        b.push(format!("LOWER({}) {} LOWER(", scope.column(col), op));
        b.push_param(val.clone());
        b.push(")");
    } else {
        b.push(format!("{} {} ", scope.column(col), op));
        b.push_param(val.clone());
    }
}

fn in_list(
    b: &mut SqlBuilder,
    scope: &Scope,
    col: &str,
    op: &str,
    values: &[FilterValue],
    insensitive: bool,
) {
    if insensitive {
        b.push(format!("LOWER({}) {} (", scope.column(col), op));
        b.push_separated(values.iter().cloned(), ", ", |b, v| {
            b.push("LOWER(");
            b.push_param(v);
            b.push(")");
        });
    } else {
        b.push(format!("{} {} (", scope.column(col), op));
        b.push_separated(values.iter().cloned(), ", ", |b, v| {
            b.push_param(v);
        });
    }
    b.push(")");
}

fn like(
    b: &mut SqlBuilder,
    scope: &Scope,
    col: &str,
    val: &FilterValue,
    prefix: &str,
    suffix: &str,
    insensitive: bool,
) {
    let op = if insensitive { "ILIKE" } else { "LIKE" };
    b.push(format!("{} {} ", scope.column(col), op));
    match val {
        FilterValue::String(s) => {
            b.push_param(format!("{}{}{}", prefix, escape_like(s), suffix));
        }
        other => {
            b.push_param(other.clone());
        }
    }
}

fn push_json_target(b: &mut SqlBuilder, column: &str, path: &[String], as_text: bool) {
    if path.is_empty() {
        if as_text {
            b.push(format!("({} #>> '{{}}')", column));
        } else {
            b.push(column);
        }
        return;
    }
    let op = if as_text { "#>>" } else { "#>" };
    b.push(format!("({} {} ", column, op));
    b.push_param(FilterValue::List(
        path.iter().cloned().map(FilterValue::String).collect(),
    ));
    b.push("::text[])");
}

fn render_json(b: &mut SqlBuilder, scope: &Scope, col: &str, filter: &JsonFilter) {
    let column = scope.column(col);
    let path = &filter.path;
    match &filter.op {
        JsonOp::Equals(v) => {
            push_json_target(b, &column, path, false);
            b.push(" = ");
            b.push_param(FilterValue::Json(v.clone()));
            b.push("::jsonb");
        }
        JsonOp::Not(v) => {
            push_json_target(b, &column, path, false);
            b.push(" <> ");
            b.push_param(FilterValue::Json(v.clone()));
            b.push("::jsonb");
        }
        JsonOp::StringContains(s) => {
            push_json_target(b, &column, path, true);
            b.push(" LIKE ");
            b.push_param(format!("%{}%", escape_like(s)));
        }
        JsonOp::StringStartsWith(s) => {
            push_json_target(b, &column, path, true);
            b.push(" LIKE ");
            b.push_param(format!("{}%", escape_like(s)));
        }
        JsonOp::StringEndsWith(s) => {
            push_json_target(b, &column, path, true);
            b.push(" LIKE ");
            b.push_param(format!("%{}", escape_like(s)));
        }
        JsonOp::ArrayContains(v) => {
            let needle = match v {
                Value::Array(_) => v.clone(),
                other => Value::Array(vec![other.clone()]),
            };
            push_json_target(b, &column, path, false);
            b.push(" @> ");
            b.push_param(FilterValue::Json(needle));
            b.push("::jsonb");
        }
    }
}

fn render_relation(
    b: &mut SqlBuilder,
    scope: &Scope,
    kind: RelationFilterKind,
    relation: &'static RelationMeta,
    filter: &Filter,
) {
    if kind == RelationFilterKind::Every && filter.is_none() {
        b.push("TRUE");
        return;
    }

    let inner = scope.nested(relation.target.table);
    let negated = matches!(
        kind,
        RelationFilterKind::Every | RelationFilterKind::None | RelationFilterKind::IsNot
    );
    if negated {
        b.push("NOT ");
    }
    b.push("EXISTS (SELECT 1 FROM ");
    b.push(inner.from_clause());
    b.push(" WHERE ");
    b.push(join_condition(relation, scope, &inner));
    if !filter.is_none() {
        if kind == RelationFilterKind::Every {
            b.push(" AND NOT (");
        } else {
            b.push(" AND (");
        }
        filter.render(&inner, b, false);
        b.push(")");
    }
    b.push(")");
}

/// A filter on model `M`.
///
/// Produced by the generated field and relation handles
/// (`user::email::contains("@example.com")`) and accepted by every operation
/// on `M`.
pub struct Where<M> {
    filter: Filter,
    _model: PhantomData<fn() -> M>,
}

impl<M> Where<M> {
    /// Wrap an untyped filter.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            _model: PhantomData,
        }
    }

    /// A filter that matches every row.
    pub fn any_row() -> Self {
        Self::new(Filter::None)
    }

    /// All conditions must hold (`AND`).
    pub fn and(conditions: impl IntoIterator<Item = Where<M>>) -> Self {
        Self::new(Filter::and(conditions.into_iter().map(|w| w.filter)))
    }

    /// At least one condition must hold (`OR`).
    pub fn or(conditions: impl IntoIterator<Item = Where<M>>) -> Self {
        Self::new(Filter::or(conditions.into_iter().map(|w| w.filter)))
    }

    /// None of the conditions may hold (`NOT`).
    #[allow(clippy::should_implement_trait)]
    pub fn not(conditions: impl IntoIterator<Item = Where<M>>) -> Self {
        Self::new(Filter::and(
            conditions.into_iter().map(|w| Filter::not(w.filter)),
        ))
    }

    /// Add another condition with `AND`.
    pub fn and_where(self, other: Where<M>) -> Self {
        Self::new(self.filter.and_then(other.filter))
    }

    /// Add an alternative with `OR`.
    pub fn or_where(self, other: Where<M>) -> Self {
        Self::new(self.filter.or_else(other.filter))
    }

    /// Negate this condition.
    pub fn negate(self) -> Self {
        Self::new(Filter::not(self.filter))
    }

    /// The underlying filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Unwrap the underlying filter.
    pub fn into_filter(self) -> Filter {
        self.filter
    }

    /// Whether this matches every row.
    pub fn is_empty(&self) -> bool {
        self.filter.is_none()
    }
}

impl<M> Clone for Where<M> {
    fn clone(&self) -> Self {
        Self::new(self.filter.clone())
    }
}

impl<M> fmt::Debug for Where<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Where").field(&self.filter).finish()
    }
}

impl<M> PartialEq for Where<M> {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter
    }
}

impl<M> Default for Where<M> {
    fn default() -> Self {
        Self::any_row()
    }
}

impl<M> From<Where<M>> for Filter {
    fn from(w: Where<M>) -> Self {
        w.filter
    }
}
