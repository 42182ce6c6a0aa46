//! Per-model delegates.
//!
//! A delegate is what `client.tweet()` returns. Every method starts one
//! operation builder bound to the client's engine.

use std::fmt;
use std::marker::PhantomData;

use crate::operations::{
    AggregateOperation, CountOperation, CreateManyAndReturnOperation, CreateManyOperation, CreateOperation,
    DeleteManyOperation, DeleteOperation, FindFirstOperation, FindManyOperation, FindUniqueOperation,
    GroupByOperation, Optional, Required, UpdateManyAndReturnOperation, UpdateManyOperation, UpdateOperation,
    UpsertOperation,
};
use crate::traits::{Model, QueryEngine};

/// The query surface of model `M`.
pub struct Delegate<E: QueryEngine, M: Model> {
    engine: E,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: Model> Delegate<E, M> {
    /// Create a delegate over `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            _model: PhantomData,
        }
    }

    /// The engine operations run on.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Find the record identified by a unique value, if any.
    pub fn find_unique(&self, unique: M::UniqueWhere) -> FindUniqueOperation<E, M, Optional> {
        FindUniqueOperation::new(self.engine.clone(), unique)
    }

    /// Find the record identified by a unique value or fail with `P2025`.
    pub fn find_unique_or_throw(&self, unique: M::UniqueWhere) -> FindUniqueOperation<E, M, Required> {
        FindUniqueOperation::new(self.engine.clone(), unique)
    }

    /// Find the first record matching a query, if any.
    pub fn find_first(&self) -> FindFirstOperation<E, M, Optional> {
        FindFirstOperation::new(self.engine.clone())
    }

    /// Find the first record matching a query or fail with `P2025`.
    pub fn find_first_or_throw(&self) -> FindFirstOperation<E, M, Required> {
        FindFirstOperation::new(self.engine.clone())
    }

    /// Find every record matching a query.
    pub fn find_many(&self) -> FindManyOperation<E, M> {
        FindManyOperation::new(self.engine.clone())
    }

    /// Create one record.
    pub fn create(&self, data: M::CreateInput) -> CreateOperation<E, M> {
        CreateOperation::new(self.engine.clone(), data)
    }

    /// Create several records and return how many were created.
    pub fn create_many(&self, data: impl IntoIterator<Item = M::CreateInput>) -> CreateManyOperation<E, M> {
        CreateManyOperation::new(self.engine.clone(), data)
    }

    /// Create several records and return them.
    pub fn create_many_and_return(
        &self,
        data: impl IntoIterator<Item = M::CreateInput>,
    ) -> CreateManyAndReturnOperation<E, M> {
        CreateManyAndReturnOperation::new(self.engine.clone(), data)
    }

    /// Update the record identified by a unique value.
    pub fn update(&self, unique: M::UniqueWhere, data: M::UpdateInput) -> UpdateOperation<E, M> {
        UpdateOperation::new(self.engine.clone(), unique, data)
    }

    /// Update every record matching a filter and return how many changed.
    pub fn update_many(&self, data: M::UpdateInput) -> UpdateManyOperation<E, M> {
        UpdateManyOperation::new(self.engine.clone(), data)
    }

    /// Update every record matching a filter and return them.
    pub fn update_many_and_return(&self, data: M::UpdateInput) -> UpdateManyAndReturnOperation<E, M> {
        UpdateManyAndReturnOperation::new(self.engine.clone(), data)
    }

    /// Create a record, or update it when the unique value already exists.
    pub fn upsert(
        &self,
        unique: M::UniqueWhere,
        create: M::CreateInput,
        update: M::UpdateInput,
    ) -> UpsertOperation<E, M> {
        UpsertOperation::new(self.engine.clone(), unique, create, update)
    }

    /// Delete the record identified by a unique value.
    pub fn delete(&self, unique: M::UniqueWhere) -> DeleteOperation<E, M> {
        DeleteOperation::new(self.engine.clone(), unique)
    }

    /// Delete every record matching a filter.
    pub fn delete_many(&self) -> DeleteManyOperation<E, M> {
        DeleteManyOperation::new(self.engine.clone())
    }

    /// Aggregate the records matching a query.
    pub fn aggregate(&self) -> AggregateOperation<E, M> {
        AggregateOperation::new(self.engine.clone())
    }

    /// Group records by `by` and aggregate every group.
    pub fn group_by(&self, by: impl IntoIterator<Item = M::ScalarField>) -> GroupByOperation<E, M> {
        GroupByOperation::new(self.engine.clone(), by)
    }

    /// Count the records matching a query.
    pub fn count(&self) -> CountOperation<E, M> {
        CountOperation::new(self.engine.clone())
    }
}

impl<E: QueryEngine, M: Model> Clone for Delegate<E, M> {
    fn clone(&self) -> Self {
        Self::new(self.engine.clone())
    }
}

impl<E: QueryEngine, M: Model> fmt::Debug for Delegate<E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate").field("model", &M::MODEL_NAME).finish()
    }
}
