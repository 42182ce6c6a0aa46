//! FindUnique operation for querying a single record by unique identifier.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::QueryResult;
use crate::filter::Where;
use crate::pagination::Pagination;
use crate::sql::Statement;
use crate::traits::{Model, QueryEngine, Row, UniqueFilter};

use super::{Cardinality, Optional, ReadArgs, decode, projection_methods};

/// A query operation that finds a record by a unique identifier.
///
/// `C` is [`Optional`] for `find_unique` and [`super::Required`] for
/// `find_unique_or_throw`.
///
/// # Example
///
/// ```rust,ignore
/// let user = client
///     .user()
///     .find_unique(user::UniqueWhere::Email("ada@example.com".into()))
///     .include(user::posts::include())
///     .exec()
///     .await?;
/// ```
pub struct FindUniqueOperation<E: QueryEngine, M: Model, C: Cardinality = Optional> {
    engine: E,
    args: ReadArgs,
    _model: PhantomData<fn() -> (M, C)>,
}

impl<E: QueryEngine, M: Model, C: Cardinality> FindUniqueOperation<E, M, C> {
    /// Create a new FindUnique operation.
    pub fn new(engine: E, unique: M::UniqueWhere) -> Self {
        Self {
            engine,
            args: ReadArgs {
                filter: unique.into_filter(),
                pagination: Pagination::new().take(1),
                ..Default::default()
            },
            _model: PhantomData,
        }
    }

    /// Require additional non-unique conditions.
    pub fn and_where(mut self, filter: Where<M>) -> Self {
        self.args.filter = self.args.filter.and_then(filter.into_filter());
        self
    }

    projection_methods!(args.projection);

    /// Build the SQL query.
    pub fn build_sql(&self) -> QueryResult<Statement> {
        self.args.build(M::meta()).map(|(statement, _)| statement)
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
        let rows = self.args.fetch(&self.engine, M::meta()).await?;
        Ok(rows.into_iter().next())
    }
}
