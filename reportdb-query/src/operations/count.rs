//! Count operation for counting records.

use std::marker::PhantomData;

use serde_json::Value;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::Where;
use crate::sql::{SqlBuilder, Statement, quote_identifier};
use crate::traits::{Model, QueryEngine, UniqueFilter};
use crate::types::OrderBy;

use super::ReadArgs;

/// Column alias of the count.
const COUNT_ALIAS: &str = "_count";

/// A count operation for counting records.
///
/// `skip`, `take` and `cursor` count the records of that page only.
///
/// # Example
///
/// ```rust,ignore
/// let count = client
///     .tweet()
///     .count()
///     .r#where(tweet::twitter_user_id::equals(user_id))
///     .exec()
///     .await?;
/// ```
pub struct CountOperation<E: QueryEngine, M: Model> {
    engine: E,
    args: ReadArgs,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> CountOperation<E, M> {
    /// Create a new Count operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            args: ReadArgs::default(),
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

    /// Start counting at the record identified by `cursor` (inclusive).
    pub fn cursor(mut self, cursor: M::UniqueWhere) -> Self {
        self.args.cursor = Some(cursor.into_filter());
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.args.pagination = self.args.pagination.skip(n);
        self
    }

    /// Count at most `|n|` records; negative values read backwards.
    pub fn take(mut self, n: i64) -> Self {
        self.args.pagination = self.args.pagination.take(n);
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> Statement {
        let meta = M::meta();
        let alias = quote_identifier(COUNT_ALIAS);
        let mut builder = SqlBuilder::new();
        if self.args.is_paged() {
            builder.push(format!("SELECT COUNT(*) AS {} FROM (", alias));
            self.args.push_select(&mut builder, meta, "1");
            builder.push(") AS \"sub\"");
        } else {
            // Orderings do not change a plain count.
            let args = ReadArgs {
                filter: self.args.filter.clone(),
                ..Default::default()
            };
            args.push_select(&mut builder, meta, &format!("COUNT(*) AS {}", alias));
        }
        builder.build()
    }

    /// Execute the count.
    pub async fn exec(self) -> QueryResult<i64> {
        let statement = self.build_sql();
        debug!(model = M::MODEL_NAME, sql = %statement.sql, "Counting records");
        let rows = self.engine.query(&statement.sql, statement.params).await?;
        let count = rows.first().and_then(|row| row.get(COUNT_ALIAS)).cloned();
        match count {
            Some(value) => count_value(&value),
            None => Ok(0),
        }
    }
}

/// Read a count that may come back as a number or as numeric text.
pub(crate) fn count_value(value: &Value) -> QueryResult<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| QueryError::deserialization(format!("count {} is not an integer", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| QueryError::deserialization(format!("count {:?} is not an integer", s))),
        Value::Null => Ok(0),
        other => Err(QueryError::deserialization(format!("unexpected count value {}", other))),
    }
}
