//! Core traits: the driver seam and the contract generated models implement.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::inputs::Assignment;
use crate::meta::{FieldMeta, ModelMeta};
use crate::transaction::TransactionConfig;

/// A boxed future for async engine operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A result row keyed by field name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The driver seam.
///
/// An engine executes PostgreSQL statements with `$n` placeholders and
/// returns rows as JSON objects whose keys are the selected column aliases.
/// Everything above this trait is driver-independent.
pub trait QueryEngine: Clone + Send + Sync + 'static {
    /// Run a statement that returns rows.
    fn query(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>>;

    /// Establish the connection eagerly.
    fn connect(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Close the connection.
    fn disconnect(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Open a transaction and return an engine bound to it.
    ///
    /// The default runs `BEGIN` on `self`, which is only correct for engines
    /// that hold a single connection. Pooled drivers override this to pin a
    /// connection for the lifetime of the returned engine.
    fn begin(&self, config: &TransactionConfig) -> BoxFuture<'_, QueryResult<Self>> {
        let sql = config.to_begin_sql();
        Box::pin(async move {
            self.execute(&sql, Vec::new()).await?;
            Ok(self.clone())
        })
    }

    /// Commit the transaction this engine is bound to.
    fn commit(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(async move { self.execute("COMMIT", Vec::new()).await.map(|_| ()) })
    }

    /// Roll back the transaction this engine is bound to.
    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(async move { self.execute("ROLLBACK", Vec::new()).await.map(|_| ()) })
    }
}

/// A generated model payload.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Model name in the schema.
    const MODEL_NAME: &'static str;
    /// Table name in the database.
    const TABLE_NAME: &'static str;

    /// The `ScalarFieldEnum` of this model.
    type ScalarField: ScalarFieldEnum;
    /// The `WhereUniqueInput` of this model.
    type UniqueWhere: UniqueFilter;
    /// The unchecked create input.
    type CreateInput: CreateData;
    /// The update input.
    type UpdateInput: UpdateData;

    /// Static metadata.
    fn meta() -> &'static ModelMeta;
}

/// Enum with one variant per scalar field.
pub trait ScalarFieldEnum: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Metadata of the field.
    fn meta(&self) -> &'static FieldMeta;

    /// Field name.
    fn name(&self) -> &'static str {
        self.meta().name
    }

    /// Column name.
    fn column(&self) -> &'static str {
        self.meta().column
    }
}

/// A value identifying exactly one row.
pub trait UniqueFilter: Send + 'static {
    /// Render as a filter on the identifying columns.
    fn into_filter(self) -> Filter;

    /// The identifying columns (the conflict target for upserts).
    fn columns(&self) -> &'static [&'static str];
}

/// Create input: the values of the fields the caller set.
pub trait CreateData: Send + 'static {
    /// `(field name, value)` pairs; unset optional fields are omitted.
    fn into_values(self) -> Vec<(&'static str, FilterValue)>;
}

/// Update input: the assignments of the fields the caller set.
pub trait UpdateData: Send + 'static {
    /// `(field name, assignment)` pairs; unset fields are omitted.
    fn into_assignments(self) -> Vec<(&'static str, Assignment)>;
}
