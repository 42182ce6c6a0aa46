//! Typed handle on a relation field.

use std::fmt;
use std::marker::PhantomData;

use crate::filter::{Filter, RelationFilterKind, Where};
use crate::meta::RelationMeta;
use crate::traits::Model;
use crate::types::{OrderBy, SortOrder};

use super::include::{Include, RelationInclude};

/// Relation from model `M` to model `T`.
///
/// The generated `m::relation` modules wrap one of these.
pub struct RelationField<M, T> {
    meta: &'static RelationMeta,
    _models: PhantomData<fn() -> (M, T)>,
}

impl<M, T> RelationField<M, T> {
    /// Wrap relation metadata.
    pub const fn new(meta: &'static RelationMeta) -> Self {
        Self {
            meta,
            _models: PhantomData,
        }
    }

    /// The relation metadata.
    pub fn meta(&self) -> &'static RelationMeta {
        self.meta
    }

    fn quantify(&self, kind: RelationFilterKind, filter: Where<T>) -> Where<M> {
        Where::new(Filter::Relation {
            kind,
            relation: self.meta,
            filter: Box::new(filter.into_filter()),
        })
    }

    /// At least one related record matches (list relations).
    pub fn some(&self, filter: Where<T>) -> Where<M> {
        self.quantify(RelationFilterKind::Some, filter)
    }

    /// Every related record matches (list relations).
    pub fn every(&self, filter: Where<T>) -> Where<M> {
        self.quantify(RelationFilterKind::Every, filter)
    }

    /// No related record matches (list relations).
    pub fn none(&self, filter: Where<T>) -> Where<M> {
        self.quantify(RelationFilterKind::None, filter)
    }

    /// The related record exists and matches (to-one relations).
    pub fn is(&self, filter: Where<T>) -> Where<M> {
        self.quantify(RelationFilterKind::Is, filter)
    }

    /// The related record is missing or does not match (to-one relations).
    pub fn is_not(&self, filter: Where<T>) -> Where<M> {
        self.quantify(RelationFilterKind::IsNot, filter)
    }

    /// No related record exists (optional to-one relations).
    pub fn is_null(&self) -> Where<M> {
        self.quantify(RelationFilterKind::None, Where::any_row())
    }

    /// Order by a field of the related record (to-one relations).
    pub fn order_by(&self, order: OrderBy<T>) -> OrderBy<M> {
        OrderBy::relation(self.meta, order)
    }

    /// Order by the number of related records (list relations).
    pub fn order_by_count(&self, order: SortOrder) -> OrderBy<M> {
        OrderBy::relation_count(self.meta, order)
    }

    /// Count related records into `_count`.
    pub fn count(&self) -> Include<M> {
        Include::count(self.meta)
    }
}

impl<M, T: Model> RelationField<M, T> {
    /// Load the related records.
    pub fn include(&self) -> RelationInclude<M, T> {
        RelationInclude::new(self.meta)
    }
}

impl<M, T> Clone for RelationField<M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for RelationField<M, T> {}

impl<M, T> fmt::Debug for RelationField<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelationField").field(&self.meta.name).finish()
    }
}
