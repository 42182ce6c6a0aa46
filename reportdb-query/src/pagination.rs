//! Pagination: `skip`/`take`, cursors and `distinct`.
//!
//! ```rust
//! use reportdb_query::Pagination;
//!
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(), "LIMIT 20 OFFSET 10");
//!
//! // A negative take reads backwards.
//! let last = Pagination::new().take(-5);
//! assert!(last.is_backwards());
//! assert_eq!(last.to_sql(), "LIMIT 5");
//! ```
//!
//! A cursor starts the page at a unique record (inclusive). It is rendered
//! as a `WITH "cursor"` CTE holding that record, and a lexicographic
//! condition over the ordering columns comparing each row with it. When the
//! cursor record does not exist the page is empty.

use std::collections::HashSet;
use std::fmt::Write;

use crate::filter::Filter;
use crate::meta::ModelMeta;
use crate::sql::{Scope, SqlBuilder, quote_identifier};
use crate::traits::Row;
use crate::types::{NullsOrder, OrderSpec, OrderTarget, SortOrder};

/// Name of the CTE holding the cursor record.
pub const CURSOR_CTE: &str = "cursor";

/// Offset pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Number of records to take; negative reads backwards.
    pub take: Option<i64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the number of records to take.
    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Whether the page is read backwards.
    pub fn is_backwards(&self) -> bool {
        self.take.is_some_and(|t| t < 0)
    }

    /// Generate the `LIMIT`/`OFFSET` clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        if let Some(take) = self.take {
            let _ = write!(sql, "LIMIT {}", take.unsigned_abs());
        }
        if let Some(skip) = self.skip.filter(|s| *s > 0) {
            if !sql.is_empty() {
                sql.push(' ');
            }
            let _ = write!(sql, "OFFSET {}", skip);
        }
        sql
    }

    /// Apply to rows already fetched in page order.
    pub fn apply(&self, rows: Vec<Row>) -> Vec<Row> {
        let skip = self.skip.unwrap_or(0) as usize;
        let rows = rows.into_iter().skip(skip);
        match self.take {
            Some(take) => rows.take(take.unsigned_abs() as usize).collect(),
            None => rows.collect(),
        }
    }
}

/// Orderings used for a paginated read.
///
/// Cursor and backwards reads need a total order, so the primary key is
/// appended as a tiebreaker. A backwards read flips every entry.
pub(crate) fn effective_order(
    meta: &'static ModelMeta,
    order_by: &[OrderSpec],
    stable: bool,
    backwards: bool,
) -> Vec<OrderSpec> {
    let mut specs = order_by.to_vec();
    if stable {
        for field in meta.primary_key_fields() {
            let present = specs.iter().any(|s| s.scalar_field() == Some(field.name));
            if !present {
                specs.push(OrderSpec {
                    target: OrderTarget::Field {
                        field: field.name,
                        column: field.column,
                    },
                    order: SortOrder::Asc,
                    nulls: None,
                });
            }
        }
    }
    if backwards {
        specs = specs.iter().map(OrderSpec::reversed).collect();
    }
    specs
}

/// Render `WITH "cursor" AS (…) ` selecting the record identified by `cursor`.
pub(crate) fn push_cursor_cte(builder: &mut SqlBuilder, meta: &'static ModelMeta, cursor: &Filter) {
    let scope = Scope::root(meta.table);
    builder.push(format!(
        "WITH {} AS (SELECT * FROM {} WHERE ",
        quote_identifier(CURSOR_CTE),
        scope.from_clause()
    ));
    cursor.to_sql(&scope, builder);
    builder.push(" LIMIT 1) ");
}

/// The condition placing a row at or after the cursor record in `order`.
///
/// Only plain field orderings take part; relation and aggregate orderings
/// cannot be compared against the cursor row. Nullable columns compare with
/// `IS NOT DISTINCT FROM` and place `NULL` where the ordering puts it
/// (`NULLS LAST` ascending and `NULLS FIRST` descending unless set).
pub(crate) fn cursor_condition(meta: &'static ModelMeta, order: &[OrderSpec]) -> String {
    let columns: Vec<CursorColumn> = order
        .iter()
        .filter_map(|spec| match spec.target {
            OrderTarget::Field { column, .. } => Some(CursorColumn {
                column,
                order: spec.order,
                nulls: spec.nulls.unwrap_or(match spec.order {
                    SortOrder::Asc => NullsOrder::Last,
                    SortOrder::Desc => NullsOrder::First,
                }),
                nullable: meta.field_by_column(column).is_some_and(|f| f.optional),
            }),
            _ => None,
        })
        .collect();
    if columns.is_empty() {
        return format!("EXISTS (SELECT 1 FROM {})", quote_identifier(CURSOR_CTE));
    }

    let mut branches = Vec::with_capacity(columns.len() + 1);
    for (i, column) in columns.iter().enumerate() {
        let mut parts: Vec<String> = columns[..i].iter().map(CursorColumn::same).collect();
        parts.push(column.after());
        branches.push(format!("({})", parts.join(" AND ")));
    }
    let all_equal: Vec<String> = columns.iter().map(CursorColumn::same).collect();
    branches.push(format!("({})", all_equal.join(" AND ")));

    let condition = format!("({})", branches.join(" OR "));
    if columns.iter().any(|c| c.nullable) {
        // A missing cursor row reads as NULL, which nullable columns match.
        format!("(EXISTS (SELECT 1 FROM {}) AND {})", quote_identifier(CURSOR_CTE), condition)
    } else {
        condition
    }
}

struct CursorColumn {
    column: &'static str,
    order: SortOrder,
    nulls: NullsOrder,
    nullable: bool,
}

impl CursorColumn {
    fn quoted(&self) -> String {
        quote_identifier(self.column)
    }

    fn cursor_value(&self) -> String {
        format!("(SELECT {} FROM {})", self.quoted(), quote_identifier(CURSOR_CTE))
    }

    /// The row has the cursor's value in this column.
    fn same(&self) -> String {
        let op = if self.nullable { "IS NOT DISTINCT FROM" } else { "=" };
        format!("{} {} {}", self.quoted(), op, self.cursor_value())
    }

    /// The row sorts strictly after the cursor on this column.
    fn after(&self) -> String {
        let op = match self.order {
            SortOrder::Asc => ">",
            SortOrder::Desc => "<",
        };
        let (column, value) = (self.quoted(), self.cursor_value());
        let compare = format!("{} {} {}", column, op, value);
        if !self.nullable {
            return compare;
        }
        match self.nulls {
            NullsOrder::Last => format!("({} IS NOT NULL AND ({} OR {} IS NULL))", value, compare, column),
            NullsOrder::First => format!("({} IS NOT NULL AND ({} IS NULL OR {}))", column, value, compare),
        }
    }
}

/// Keep the first row for every distinct combination of `fields`.
pub(crate) fn apply_distinct(rows: Vec<Row>, fields: &[&'static str]) -> Vec<Row> {
    if fields.is_empty() {
        return rows;
    }
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key: Vec<_> = fields.iter().map(|f| row.get(*f).cloned()).collect();
            seen.insert(serde_json::to_string(&key).unwrap_or_default())
        })
        .collect()
}
