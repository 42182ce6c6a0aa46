//! Include specifications for eager loading relations.

use std::fmt;
use std::marker::PhantomData;

use crate::filter::{Filter, Where};
use crate::meta::{FieldMeta, RelationMeta};
use crate::traits::{Model, ScalarFieldEnum};
use crate::types::{OrderBy, OrderSpec};

/// Specification for including a relation in a query.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeSpec {
    /// The relation to load.
    pub relation: &'static RelationMeta,
    /// Filter to apply to the related records.
    pub filter: Filter,
    /// Ordering for the related records.
    pub order_by: Vec<OrderSpec>,
    /// Records to skip per parent.
    pub skip: u64,
    /// Records to take per parent (negative takes from the end).
    pub take: Option<i64>,
    /// Nested includes.
    pub includes: Vec<IncludeSpec>,
    /// Nested `_count` relations.
    pub counts: Vec<&'static RelationMeta>,
    /// Fields to return; `None` returns every scalar field.
    pub select: Option<Vec<&'static FieldMeta>>,
}

impl IncludeSpec {
    /// Create a new include spec for a relation.
    pub fn new(relation: &'static RelationMeta) -> Self {
        Self {
            relation,
            filter: Filter::None,
            order_by: Vec::new(),
            skip: 0,
            take: None,
            includes: Vec::new(),
            counts: Vec::new(),
            select: None,
        }
    }

    /// Check if there are nested includes.
    pub fn has_nested(&self) -> bool {
        !self.includes.is_empty() || !self.counts.is_empty()
    }

    /// Apply `skip`/`take` to one parent's related records.
    pub(crate) fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = self.skip as usize;
        match self.take {
            Some(take) if take < 0 => {
                let mut items = items;
                let end = items.len().saturating_sub(skip);
                let start = end.saturating_sub(take.unsigned_abs() as usize);
                items.truncate(end);
                items.drain(..start);
                items
            }
            take => {
                let mut items: Vec<T> = items.into_iter().skip(skip).collect();
                if let Some(take) = take {
                    items.truncate(take as usize);
                }
                items
            }
        }
    }
}

/// One entry of an `include` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum IncludeEntry {
    /// Load a relation.
    Relation(IncludeSpec),
    /// Count the records of a list relation into `_count`.
    Count(&'static RelationMeta),
}

/// An include on model `M`.
pub struct Include<M> {
    entry: IncludeEntry,
    _model: PhantomData<fn() -> M>,
}

impl<M> Include<M> {
    /// Load `relation` with default arguments.
    pub fn relation(relation: &'static RelationMeta) -> Self {
        Self::from_entry(IncludeEntry::Relation(IncludeSpec::new(relation)))
    }

    /// Count the records of `relation`.
    pub fn count(relation: &'static RelationMeta) -> Self {
        Self::from_entry(IncludeEntry::Count(relation))
    }

    fn from_entry(entry: IncludeEntry) -> Self {
        Self {
            entry,
            _model: PhantomData,
        }
    }

    /// The untyped entry.
    pub fn entry(&self) -> &IncludeEntry {
        &self.entry
    }

    /// Unwrap the untyped entry.
    pub fn into_entry(self) -> IncludeEntry {
        self.entry
    }
}

impl<M> Clone for Include<M> {
    fn clone(&self) -> Self {
        Self::from_entry(self.entry.clone())
    }
}

impl<M> fmt::Debug for Include<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Include").field(&self.entry).finish()
    }
}

/// Builder for including relation records of model `T` on model `M`.
///
/// Returned by the generated `m::relation::include()`.
pub struct RelationInclude<M, T> {
    spec: IncludeSpec,
    _models: PhantomData<fn() -> (M, T)>,
}

impl<M, T: Model> RelationInclude<M, T> {
    /// Start an include of `relation`.
    pub fn new(relation: &'static RelationMeta) -> Self {
        Self {
            spec: IncludeSpec::new(relation),
            _models: PhantomData,
        }
    }

    /// Only load related records matching `filter`.
    pub fn r#where(mut self, filter: Where<T>) -> Self {
        self.spec.filter = self.spec.filter.and_then(filter.into_filter());
        self
    }

    /// Order the related records.
    pub fn order_by(mut self, order: OrderBy<T>) -> Self {
        self.spec.order_by.push(order.into_spec());
        self
    }

    /// Skip related records per parent.
    pub fn skip(mut self, n: u64) -> Self {
        self.spec.skip = n;
        self
    }

    /// Take related records per parent.
    pub fn take(mut self, n: i64) -> Self {
        self.spec.take = Some(n);
        self
    }

    /// Include a relation of the related model.
    pub fn include(mut self, include: impl Into<Include<T>>) -> Self {
        match include.into().into_entry() {
            IncludeEntry::Relation(spec) => self.spec.includes.push(spec),
            IncludeEntry::Count(relation) => self.spec.counts.push(relation),
        }
        self
    }

    /// Only return the given fields of the related records.
    pub fn select(mut self, fields: impl IntoIterator<Item = T::ScalarField>) -> Self {
        self.spec.select = Some(fields.into_iter().map(|f| f.meta()).collect());
        self
    }

    /// The untyped spec.
    pub fn spec(&self) -> &IncludeSpec {
        &self.spec
    }
}

impl<M, T> From<RelationInclude<M, T>> for Include<M> {
    fn from(include: RelationInclude<M, T>) -> Self {
        Include::from_entry(IncludeEntry::Relation(include.spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::test_models::{Post, User, post, user};

    fn posts() -> &'static RelationMeta {
        user::META.relation("posts").unwrap()
    }

    #[test]
    fn test_relation_include_builder() {
        let include: Include<User> = RelationInclude::<User, Post>::new(posts())
            .r#where(Where::new(Filter::Contains("name".into(), "rust".into())))
            .order_by(OrderBy::desc(post::ScalarField::CreatedAt))
            .skip(1)
            .take(2)
            .select([post::ScalarField::Id, post::ScalarField::Name])
            .into();

        let IncludeEntry::Relation(spec) = include.into_entry() else {
            panic!("expected a relation include");
        };
        assert_eq!(spec.relation.name, "posts");
        assert_eq!(spec.skip, 1);
        assert_eq!(spec.take, Some(2));
        assert_eq!(spec.order_by.len(), 1);
        let selected: Vec<_> = spec.select.unwrap().iter().map(|f| f.name).collect();
        assert_eq!(selected, vec!["id", "name"]);
    }

    #[test]
    fn test_nested_include_and_count() {
        let created_by = post::META.relation("createdBy").unwrap();
        let include = RelationInclude::<User, Post>::new(posts())
            .include(RelationInclude::<Post, User>::new(created_by))
            .include(Include::<Post>::count(created_by));
        assert_eq!(include.spec().includes.len(), 1);
        assert_eq!(include.spec().counts.len(), 1);
        assert!(include.spec().has_nested());
    }

    #[test]
    fn test_paginate_forward() {
        let mut spec = IncludeSpec::new(posts());
        spec.skip = 1;
        spec.take = Some(2);
        assert_eq!(spec.paginate(vec![1, 2, 3, 4]), vec![2, 3]);

        spec.take = None;
        assert_eq!(spec.paginate(vec![1, 2, 3]), vec![2, 3]);
    }

    #[test]
    fn test_paginate_backwards() {
        let mut spec = IncludeSpec::new(posts());
        spec.take = Some(-2);
        assert_eq!(spec.paginate(vec![1, 2, 3, 4]), vec![3, 4]);

        spec.skip = 1;
        assert_eq!(spec.paginate(vec![1, 2, 3, 4]), vec![2, 3]);
        assert_eq!(spec.paginate(Vec::<i32>::new()), Vec::<i32>::new());
    }
}
