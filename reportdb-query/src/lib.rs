//! # reportdb-query
//!
//! The query runtime behind the generated reportdb client.
//!
//! This crate provides everything the generated code builds on:
//! - Model-typed filters (`Where<M>`) rendered to PostgreSQL with `$n` placeholders
//! - Ordering, `skip`/`take`, cursors and `distinct`
//! - The seventeen model actions (`find_many`, `create`, `upsert`, `group_by`, …)
//! - Relation loading (`include`, `_count`)
//! - Interactive transactions, batches and raw SQL
//! - Query extensions and log events
//!
//! The database driver is abstracted by [`QueryEngine`]; any engine that runs
//! PostgreSQL statements and returns rows as JSON objects can be plugged in.
//!
//! ## Filters
//!
//! ```rust
//! use reportdb_query::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::Equals("twitterUserId".into(), FilterValue::String("42".into())),
//!     Filter::Gt("likeCount".into(), FilterValue::Int(10)),
//! ]);
//!
//! let statement = filter.to_statement("Tweet");
//! assert_eq!(statement.sql, "(\"twitterUserId\" = $1 AND \"likeCount\" > $2)");
//! assert_eq!(statement.params.len(), 2);
//! ```
//!
//! ## Filter Values
//!
//! ```rust
//! use reportdb_query::FilterValue;
//!
//! let val: FilterValue = 42.into();
//! assert!(matches!(val, FilterValue::Int(42)));
//!
//! let val: FilterValue = "hello".into();
//! assert!(matches!(val, FilterValue::String(_)));
//!
//! let val: FilterValue = None::<String>.into();
//! assert!(val.is_null());
//! ```
//!
//! ## Raw SQL
//!
//! ```rust
//! use reportdb_query::raw_query;
//!
//! let sql = raw_query!("SELECT * FROM \"Report\" WHERE \"walletId\" = {}", 7);
//! assert_eq!(sql.sql(), "SELECT * FROM \"Report\" WHERE \"walletId\" = $1");
//! ```
//!
//! ## Generated usage
//!
//! ```rust,ignore
//! let tweets = client
//!     .tweet()
//!     .find_many()
//!     .r#where(tweet::like_count::gt(100))
//!     .order_by(tweet::tweeted_at::desc())
//!     .include(tweet::twitter_user::include())
//!     .take(20)
//!     .exec()
//!     .await?;
//! ```

pub mod client;
pub mod delegate;
pub mod error;
pub mod events;
pub mod extension;
pub mod fields;
pub mod filter;
pub mod inputs;
pub mod instrument;
pub mod logging;
pub mod meta;
pub mod operations;
pub mod pagination;
pub mod raw;
pub mod relations;
pub mod sql;
pub mod testing;
pub mod traits;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod test_models;

pub use client::ClientCore;
pub use delegate::Delegate;
pub use error::{ErrorCode, ErrorContext, ErrorKind, QueryError, QueryResult, Suggestion};
pub use events::{ClientOptions, EmitMode, Event, LogEvent, LogLevel, QueryEvent};
pub use extension::{QueryContext, QueryExtension, QueryKind, QueryOutput, map_rows, rewrite_statement};
pub use fields::{BoolField, DateTimeField, FieldHandle, JsonField, JsonPath, NumberField, StringField};
pub use filter::{Filter, FilterValue, JsonFilter, JsonOp, RelationFilterKind, Where};
pub use inputs::{Assignment, NumberUpdate};
pub use instrument::Instrumented;
pub use meta::{DefaultKind, FieldMeta, ModelMeta, RelationMeta, ScalarKind};
pub use operations::{
    AggregateOperation, AggregateRow, Cardinality, CountOperation, CreateManyAndReturnOperation, CreateManyOperation,
    CreateOperation, DeleteManyOperation, DeleteOperation, FindFirstOperation, FindManyOperation, FindUniqueOperation,
    GroupByOperation, Having, HavingAggregate, Optional, Required, UpdateManyAndReturnOperation, UpdateManyOperation,
    UpdateOperation, UpsertOperation,
};
pub use pagination::Pagination;
pub use raw::Sql;
pub use relations::{Include, IncludeSpec, RelationField, RelationInclude};
pub use sql::Statement;
pub use traits::{
    BoxFuture, CreateData, Model, QueryEngine, Row, ScalarFieldEnum, UniqueFilter, UpdateData,
};
pub use transaction::{IsolationLevel, TransactionConfig};
pub use types::{AggregateFn, NullsOrder, OrderBy, SortOrder};

#[doc(hidden)]
pub use tracing as __tracing;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::ClientCore;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::events::{ClientOptions, EmitMode, LogLevel};
    pub use crate::filter::{Filter, FilterValue, Where};
    pub use crate::inputs::NumberUpdate;
    pub use crate::operations::{Having, Optional, Required};
    pub use crate::raw::Sql;
    pub use crate::raw_query;
    pub use crate::traits::{Model, QueryEngine};
    pub use crate::transaction::{IsolationLevel, TransactionConfig};
    pub use crate::types::{AggregateFn, OrderBy, SortOrder};
}
