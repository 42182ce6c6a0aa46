//! Arguments shared by the read operations.

use tracing::debug;

use crate::error::QueryResult;
use crate::filter::Filter;
use crate::meta::{FieldMeta, ModelMeta};
use crate::pagination::{Pagination, apply_distinct, cursor_condition, effective_order, push_cursor_cte};
use crate::sql::{Scope, SqlBuilder, Statement};
use crate::traits::{QueryEngine, Row};
use crate::types::{OrderSpec, order_clause};

use super::{Columns, Projection, finish, push_where, select_list};

/// `where`, `orderBy`, `cursor`, `skip`, `take`, `distinct` and the
/// projection of a `find*` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ReadArgs {
    pub filter: Filter,
    pub order_by: Vec<OrderSpec>,
    pub cursor: Option<Filter>,
    pub pagination: Pagination,
    pub distinct: Vec<&'static FieldMeta>,
    pub projection: Projection,
}

impl ReadArgs {
    /// Render the `SELECT`.
    ///
    /// With `distinct` the page is cut after de-duplication, so `LIMIT` and
    /// `OFFSET` are left out of the statement.
    pub fn build(&self, meta: &'static ModelMeta) -> QueryResult<(Statement, Columns)> {
        let required: Vec<&'static str> = self.distinct.iter().map(|f| f.name).collect();
        let columns = self.projection.columns(meta, &required)?;
        let mut builder = SqlBuilder::new();
        self.push_select(&mut builder, meta, &select_list(&columns.fields));
        Ok((builder.build(), columns))
    }

    /// Render `[WITH "cursor" …] SELECT {list} FROM … WHERE … ORDER BY …
    /// [LIMIT …]` into `builder`.
    pub fn push_select(&self, builder: &mut SqlBuilder, meta: &'static ModelMeta, list: &str) {
        let backwards = self.pagination.is_backwards();
        let order = effective_order(meta, &self.order_by, self.cursor.is_some() || backwards, backwards);

        let scope = Scope::root(meta.table);
        if let Some(cursor) = &self.cursor {
            push_cursor_cte(builder, meta, cursor);
        }
        builder
            .push("SELECT ")
            .push(list)
            .push(" FROM ")
            .push(scope.from_clause());
        let cursor = self.cursor.as_ref().map(|_| cursor_condition(meta, &order));
        push_where(builder, &scope, &self.filter, cursor);
        builder.push(order_clause(&order, &scope));
        if self.distinct.is_empty() {
            let page = self.pagination.to_sql();
            if !page.is_empty() {
                builder.push(" ").push(page);
            }
        }
    }

    /// Whether the read is cut by `skip`, `take` or `cursor`.
    pub fn is_paged(&self) -> bool {
        self.cursor.is_some() || !self.pagination.is_empty()
    }

    /// Run the read and load its relations.
    pub async fn fetch<E: QueryEngine>(&self, engine: &E, meta: &'static ModelMeta) -> QueryResult<Vec<Row>> {
        let (statement, columns) = self.build(meta)?;
        debug!(model = meta.name, sql = %statement.sql, "Reading records");
        let mut rows = engine.query(&statement.sql, statement.params).await?;

        if !self.distinct.is_empty() {
            let fields: Vec<&'static str> = self.distinct.iter().map(|f| f.name).collect();
            rows = apply_distinct(rows, &fields);
            rows = self.pagination.apply(rows);
        }
        if self.pagination.is_backwards() {
            rows.reverse();
        }
        finish(engine, &self.projection, &columns, rows).await
    }
}
