//! FindFirst operation for querying the first matching record.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::QueryResult;
use crate::filter::Where;
use crate::sql::Statement;
use crate::traits::{Model, QueryEngine, Row, ScalarFieldEnum, UniqueFilter};
use crate::types::OrderBy;

use super::{Cardinality, Optional, ReadArgs, decode, projection_methods};

/// A query operation that finds the first record matching a filter.
///
/// `C` is [`Optional`] for `find_first` and [`super::Required`] for
/// `find_first_or_throw`.
///
/// # Example
///
/// ```rust,ignore
/// let latest = client
///     .latest_tweets_query()
///     .find_first()
///     .r#where(latest_tweets_query::twitter_user_id::equals(user_id))
///     .order_by(latest_tweets_query::fetched_at::desc())
///     .exec()
///     .await?;
/// ```
pub struct FindFirstOperation<E: QueryEngine, M: Model, C: Cardinality = Optional> {
    engine: E,
    args: ReadArgs,
    _model: PhantomData<fn() -> (M, C)>,
}

impl<E: QueryEngine, M: Model, C: Cardinality> FindFirstOperation<E, M, C> {
    /// Create a new FindFirst operation.
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

    /// Add an ordering.
    pub fn order_by(mut self, order: OrderBy<M>) -> Self {
        self.args.order_by.push(order.into_spec());
        self
    }

    /// Start searching at the record identified by `cursor` (inclusive).
    pub fn cursor(mut self, cursor: M::UniqueWhere) -> Self {
        self.args.cursor = Some(cursor.into_filter());
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.args.pagination = self.args.pagination.skip(n);
        self
    }

    /// Only the sign matters: a negative take returns the last match.
    pub fn take(mut self, n: i64) -> Self {
        self.args.pagination = self.args.pagination.take(n);
        self
    }

    /// Consider only the first record for every combination of `fields`.
    pub fn distinct(mut self, fields: impl IntoIterator<Item = M::ScalarField>) -> Self {
        self.args.distinct = fields.into_iter().map(|f| f.meta()).collect();
        self
    }

    projection_methods!(args.projection);

    fn single(&self) -> ReadArgs {
        let mut args = self.args.clone();
        let take = if args.pagination.is_backwards() { -1 } else { 1 };
        args.pagination = args.pagination.take(take);
        args
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.single().build(M::meta()).map(|(statement, _)| statement)
    }

    /// Execute the query.
    pub async fn exec(self) -> QueryResult<C::Output<M>> {
        self.exec_as().await
    }

    /// Execute the query and decode the record into `T`.
    pub async fn exec_as<T: DeserializeOwned>(self) -> QueryResult<C::Output<T>> {
        let record = self.fetch().await?.map(decode).transpose()?;
        C::resolve(M::MODEL_NAME, record)
    }

    /// Execute the query and return the row.
    pub async fn exec_rows(self) -> QueryResult<C::Output<Row>> {
        let record = self.fetch().await?;
        C::resolve(M::MODEL_NAME, record)
    }

    async fn fetch(&self) -> QueryResult<Option<Row>> {
        let rows = self.single().fetch(&self.engine, M::meta()).await?;
        Ok(rows.into_iter().next())
    }
}
