//! FindMany operation for querying multiple records.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::QueryResult;
use crate::filter::Where;
use crate::sql::Statement;
use crate::traits::{Model, QueryEngine, Row, ScalarFieldEnum, UniqueFilter};
use crate::types::OrderBy;

use super::{ReadArgs, decode_all, projection_methods};

/// A query operation that finds multiple records.
///
/// # Example
///
/// ```rust,ignore
/// let tweets = client
///     .tweet()
///     .find_many()
///     .r#where(tweet::twitter_user_id::equals(user_id))
///     .order_by(tweet::tweeted_at::desc())
///     .skip(0)
///     .take(10)
///     .exec()
///     .await?;
/// ```
pub struct FindManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    args: ReadArgs,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> FindManyOperation<E, M> {
    /// Create a new FindMany operation.
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

    /// Add an ordering; later calls break ties of earlier ones.
    pub fn order_by(mut self, order: OrderBy<M>) -> Self {
        self.args.order_by.push(order.into_spec());
        self
    }

    /// Start the page at the record identified by `cursor` (inclusive).
    pub fn cursor(mut self, cursor: M::UniqueWhere) -> Self {
        self.args.cursor = Some(cursor.into_filter());
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.args.pagination = self.args.pagination.skip(n);
        self
    }

    /// Take a number of records; negative values read backwards.
    pub fn take(mut self, n: i64) -> Self {
        self.args.pagination = self.args.pagination.take(n);
        self
    }

    /// Return only the first record for every combination of `fields`.
    pub fn distinct(mut self, fields: impl IntoIterator<Item = M::ScalarField>) -> Self {
        self.args.distinct = fields.into_iter().map(|f| f.meta()).collect();
        self
    }

    projection_methods!(args.projection);

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.args.build(M::meta()).map(|(statement, _)| statement)
    }

    /// Execute the query.
    pub async fn exec(self) -> QueryResult<Vec<M>> {
        self.exec_as().await
    }

    /// Execute the query and decode every record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<Vec<T>> {
        decode_all(self.exec_rows().await?)
    }

    /// Execute the query and return the rows.
    pub async fn exec_rows(self) -> QueryResult<Vec<Row>> {
        self.args.fetch(&self.engine, M::meta()).await
    }
}
