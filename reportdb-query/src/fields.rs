//! Typed handles on scalar fields.
//!
//! Generated field modules delegate to these:
//!
//! ```rust,ignore
//! pub mod email {
//!     const FIELD: StringField<User> = StringField::new("email");
//!     pub fn contains(value: impl Into<String>) -> Where<User> {
//!         FIELD.contains(value)
//!     }
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::filter::{Filter, FilterValue, JsonFilter, JsonOp, Where};

/// Rust types that map onto a non-JSON scalar column.
pub trait ScalarValue: Into<FilterValue> {}

impl ScalarValue for String {}
impl ScalarValue for bool {}
impl ScalarValue for i32 {}
impl ScalarValue for i64 {}
impl ScalarValue for f64 {}
impl ScalarValue for DateTime<Utc> {}

/// Scalar types with a total order usable in `<`/`>` comparisons.
pub trait Ordered: ScalarValue {}

impl Ordered for String {}
impl Ordered for i32 {}
impl Ordered for i64 {}
impl Ordered for f64 {}
impl Ordered for DateTime<Utc> {}

/// Handle on column `column` of model `M` holding values of type `T`.
pub struct FieldHandle<M, T> {
    column: &'static str,
    _marker: PhantomData<fn() -> (M, T)>,
}

/// A text field.
pub type StringField<M> = FieldHandle<M, String>;
/// A numeric field.
pub type NumberField<M, T> = FieldHandle<M, T>;
/// A timestamp field.
pub type DateTimeField<M> = FieldHandle<M, DateTime<Utc>>;
/// A boolean field.
pub type BoolField<M> = FieldHandle<M, bool>;
/// A JSON field.
pub type JsonField<M> = FieldHandle<M, Value>;

impl<M, T> FieldHandle<M, T> {
    /// Handle on `column`.
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            _marker: PhantomData,
        }
    }

    /// Column name.
    pub fn column(&self) -> &'static str {
        self.column
    }

    fn wrap(&self, filter: Filter) -> Where<M> {
        Where::new(filter)
    }

    /// Column is `NULL`.
    pub fn is_null(&self) -> Where<M> {
        self.wrap(Filter::IsNull(self.column.into()))
    }

    /// Column is not `NULL`.
    pub fn is_not_null(&self) -> Where<M> {
        self.wrap(Filter::IsNotNull(self.column.into()))
    }
}

impl<M, T: ScalarValue> FieldHandle<M, T> {
    /// Equals `value`.
    pub fn equals(&self, value: impl Into<T>) -> Where<M> {
        self.wrap(Filter::Equals(self.column.into(), scalar::<T>(value)))
    }

    /// Differs from `value`.
    pub fn not(&self, value: impl Into<T>) -> Where<M> {
        self.wrap(Filter::NotEquals(self.column.into(), scalar::<T>(value)))
    }

    /// One of `values`.
    pub fn in_(&self, values: impl IntoIterator<Item = impl Into<T>>) -> Where<M> {
        self.wrap(Filter::In(self.column.into(), collect::<T>(values)))
    }

    /// None of `values`.
    pub fn not_in(&self, values: impl IntoIterator<Item = impl Into<T>>) -> Where<M> {
        self.wrap(Filter::NotIn(self.column.into(), collect::<T>(values)))
    }
}

impl<M, T: Ordered> FieldHandle<M, T> {
    /// Less than `value`.
    pub fn lt(&self, value: impl Into<T>) -> Where<M> {
        self.wrap(Filter::Lt(self.column.into(), scalar::<T>(value)))
    }

    /// Less than or equal to `value`.
    pub fn lte(&self, value: impl Into<T>) -> Where<M> {
        self.wrap(Filter::Lte(self.column.into(), scalar::<T>(value)))
    }

    /// Greater than `value`.
    pub fn gt(&self, value: impl Into<T>) -> Where<M> {
        self.wrap(Filter::Gt(self.column.into(), scalar::<T>(value)))
    }

    /// Greater than or equal to `value`.
    pub fn gte(&self, value: impl Into<T>) -> Where<M> {
        self.wrap(Filter::Gte(self.column.into(), scalar::<T>(value)))
    }
}

impl<M> FieldHandle<M, String> {
    /// Contains `value`.
    pub fn contains(&self, value: impl Into<String>) -> Where<M> {
        self.wrap(Filter::Contains(self.column.into(), scalar::<String>(value)))
    }

    /// Starts with `value`.
    pub fn starts_with(&self, value: impl Into<String>) -> Where<M> {
        self.wrap(Filter::StartsWith(self.column.into(), scalar::<String>(value)))
    }

    /// Ends with `value`.
    pub fn ends_with(&self, value: impl Into<String>) -> Where<M> {
        self.wrap(Filter::EndsWith(self.column.into(), scalar::<String>(value)))
    }

    /// Case-insensitive `equals`.
    pub fn equals_insensitive(&self, value: impl Into<String>) -> Where<M> {
        self.insensitive(self.equals(value))
    }

    /// Case-insensitive `not`.
    pub fn not_insensitive(&self, value: impl Into<String>) -> Where<M> {
        self.insensitive(self.not(value))
    }

    /// Case-insensitive `in_`.
    pub fn in_insensitive(&self, values: impl IntoIterator<Item = impl Into<String>>) -> Where<M> {
        self.insensitive(self.in_(values))
    }

    /// Case-insensitive `contains`.
    pub fn contains_insensitive(&self, value: impl Into<String>) -> Where<M> {
        self.insensitive(self.contains(value))
    }

    /// Case-insensitive `starts_with`.
    pub fn starts_with_insensitive(&self, value: impl Into<String>) -> Where<M> {
        self.insensitive(self.starts_with(value))
    }

    /// Case-insensitive `ends_with`.
    pub fn ends_with_insensitive(&self, value: impl Into<String>) -> Where<M> {
        self.insensitive(self.ends_with(value))
    }

    fn insensitive(&self, filter: Where<M>) -> Where<M> {
        self.wrap(filter.into_filter().insensitive())
    }
}

impl<M> FieldHandle<M, Value> {
    /// The whole document equals `value`.
    pub fn equals(&self, value: impl Into<Value>) -> Where<M> {
        self.path(Vec::<String>::new()).equals(value)
    }

    /// The whole document differs from `value`.
    pub fn not(&self, value: impl Into<Value>) -> Where<M> {
        self.path(Vec::<String>::new()).not(value)
    }

    /// The document is a string containing `value`.
    pub fn string_contains(&self, value: impl Into<String>) -> Where<M> {
        self.path(Vec::<String>::new()).string_contains(value)
    }

    /// The document is a string starting with `value`.
    pub fn string_starts_with(&self, value: impl Into<String>) -> Where<M> {
        self.path(Vec::<String>::new()).string_starts_with(value)
    }

    /// The document is a string ending with `value`.
    pub fn string_ends_with(&self, value: impl Into<String>) -> Where<M> {
        self.path(Vec::<String>::new()).string_ends_with(value)
    }

    /// The document is an array containing `value`.
    pub fn array_contains(&self, value: impl Into<Value>) -> Where<M> {
        self.path(Vec::<String>::new()).array_contains(value)
    }

    /// Compare the value at `path` inside the document.
    pub fn path(&self, path: impl IntoIterator<Item = impl Into<String>>) -> JsonPath<M> {
        JsonPath {
            column: self.column,
            path: path.into_iter().map(Into::into).collect(),
            _model: PhantomData,
        }
    }
}

impl<M, T> Clone for FieldHandle<M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for FieldHandle<M, T> {}

impl<M, T> fmt::Debug for FieldHandle<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldHandle").field(&self.column).finish()
    }
}

/// A position inside a JSON column.
pub struct JsonPath<M> {
    column: &'static str,
    path: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M> JsonPath<M> {
    fn op(self, op: JsonOp) -> Where<M> {
        Where::new(Filter::Json(
            self.column.into(),
            JsonFilter {
                path: self.path,
                op,
            },
        ))
    }

    /// Value at the path equals `value`.
    pub fn equals(self, value: impl Into<Value>) -> Where<M> {
        self.op(JsonOp::Equals(value.into()))
    }

    /// Value at the path differs from `value`.
    pub fn not(self, value: impl Into<Value>) -> Where<M> {
        self.op(JsonOp::Not(value.into()))
    }

    /// String at the path contains `value`.
    pub fn string_contains(self, value: impl Into<String>) -> Where<M> {
        self.op(JsonOp::StringContains(value.into()))
    }

    /// String at the path starts with `value`.
    pub fn string_starts_with(self, value: impl Into<String>) -> Where<M> {
        self.op(JsonOp::StringStartsWith(value.into()))
    }

    /// String at the path ends with `value`.
    pub fn string_ends_with(self, value: impl Into<String>) -> Where<M> {
        self.op(JsonOp::StringEndsWith(value.into()))
    }

    /// Array at the path contains `value`.
    pub fn array_contains(self, value: impl Into<Value>) -> Where<M> {
        self.op(JsonOp::ArrayContains(value.into()))
    }
}

impl<M> fmt::Debug for JsonPath<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonPath")
            .field("column", &self.column)
            .field("path", &self.path)
            .finish()
    }
}

fn scalar<T: Into<FilterValue>>(value: impl Into<T>) -> FilterValue {
    let value: T = value.into();
    value.into()
}

fn collect<T: Into<FilterValue>>(values: impl IntoIterator<Item = impl Into<T>>) -> Vec<FilterValue> {
    values.into_iter().map(scalar::<T>).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::test_models::{Post, User};

    const EMAIL: StringField<User> = StringField::new("email");
    const ID: NumberField<Post, i32> = NumberField::new("id");
    const CREATED_AT: DateTimeField<Post> = DateTimeField::new("createdAt");

    fn sql<M>(filter: Where<M>, table: &'static str) -> String {
        filter.into_filter().to_statement(table).sql
    }

    // ========== String Fields ==========

    #[test]
    fn test_string_filters() {
        assert_eq!(sql(EMAIL.equals("a@b.c"), "User"), "\"email\" = $1");
        assert_eq!(sql(EMAIL.not("a@b.c"), "User"), "\"email\" <> $1");
        assert_eq!(sql(EMAIL.in_(["a", "b"]), "User"), "\"email\" IN ($1, $2)");
        assert_eq!(sql(EMAIL.ends_with("@b.c"), "User"), "\"email\" LIKE $1");
        assert_eq!(sql(EMAIL.is_null(), "User"), "\"email\" IS NULL");
    }

    #[test]
    fn test_string_insensitive_filters() {
        assert_eq!(sql(EMAIL.contains_insensitive("B.C"), "User"), "\"email\" ILIKE $1");
        assert_eq!(
            sql(EMAIL.equals_insensitive("A@B.C"), "User"),
            "LOWER(\"email\") = LOWER($1)"
        );
    }

    // ========== Number And Date Fields ==========

    #[test]
    fn test_number_comparisons() {
        let statement = ID.gte(10).and_where(ID.lt(20)).into_filter().to_statement("Post");
        assert_eq!(statement.sql, "(\"id\" >= $1 AND \"id\" < $2)");
        assert_eq!(statement.params, vec![FilterValue::Int(10), FilterValue::Int(20)]);
        assert_eq!(sql(ID.not_in([1, 2]), "Post"), "\"id\" NOT IN ($1, $2)");
    }

    #[test]
    fn test_date_comparison() {
        let now = Utc::now();
        let statement = CREATED_AT.lte(now).into_filter().to_statement("Post");
        assert_eq!(statement.sql, "\"createdAt\" <= $1");
        assert_eq!(statement.params, vec![FilterValue::DateTime(now)]);
    }

    // ========== JSON Fields ==========

    #[test]
    fn test_json_path_filters() {
        let data: JsonField<User> = JsonField::new("userInfoData");
        assert_eq!(
            sql(data.path(["legacy", "verified"]).equals(true), "TwitterUser"),
            "(\"userInfoData\" #> $1::text[]) = $2::jsonb"
        );
        assert_eq!(
            sql(data.string_contains("tez"), "TwitterUser"),
            "(\"userInfoData\" #>> '{}') LIKE $1"
        );
        assert_eq!(sql(data.equals(json!({"a": 1})), "TwitterUser"), "\"userInfoData\" = $1::jsonb");
        assert_eq!(sql(data.is_not_null(), "TwitterUser"), "\"userInfoData\" IS NOT NULL");
    }
}
