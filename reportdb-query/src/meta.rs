//! Static model metadata emitted by the generator.
//!
//! The runtime never inspects the schema file; everything it needs to render
//! SQL, fill defaults and join relations is described by these tables.

use std::fmt;

/// Scalar column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Text.
    String,
    /// Boolean.
    Boolean,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Double precision float.
    Float,
    /// Timestamp.
    DateTime,
    /// JSON document.
    Json,
}

impl ScalarKind {
    /// Whether `_avg`/`_sum` and arithmetic updates apply.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::BigInt | Self::Float)
    }
}

/// How a column gets its value when a create input leaves it unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    /// No default.
    None,
    /// Assigned by the database sequence.
    Autoincrement,
    /// Current timestamp, filled by the runtime.
    Now,
    /// Random UUID v4, filled by the runtime.
    Uuid,
    /// Literal value, stored as JSON text.
    Literal(&'static str),
}

/// A scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Field name in the schema (and the key used in result rows).
    pub name: &'static str,
    /// Column name in the database.
    pub column: &'static str,
    /// Column kind.
    pub kind: ScalarKind,
    /// Whether the column is nullable.
    pub optional: bool,
    /// Whether the field is (part of) the primary identifier.
    pub id: bool,
    /// Whether the field carries a single-field unique constraint.
    pub unique: bool,
    /// Whether the field is refreshed on every update.
    pub updated_at: bool,
    /// Default value source.
    pub default: DefaultKind,
}

/// One side of a relation.
///
/// The join condition is always
/// `self.columns[i] = target.reference_columns[i]`.
pub struct RelationMeta {
    /// Relation field name on the owning model.
    pub name: &'static str,
    /// Model declaring the relation field.
    pub model: &'static str,
    /// Model on the other side.
    pub target: &'static ModelMeta,
    /// Join field names on this model.
    pub fields: &'static [&'static str],
    /// Join column names on this model.
    pub columns: &'static [&'static str],
    /// Join field names on the target model.
    pub references: &'static [&'static str],
    /// Join column names on the target model.
    pub reference_columns: &'static [&'static str],
    /// Whether the field is a list (`Post[]`).
    pub list: bool,
    /// Whether the field is optional (`User?`).
    pub optional: bool,
}

impl RelationMeta {
    /// Column pairs `(this side, target side)`.
    pub fn join_pairs(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.columns
            .iter()
            .copied()
            .zip(self.reference_columns.iter().copied())
    }
}

impl fmt::Debug for RelationMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationMeta")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("target", &self.target.name)
            .field("fields", &self.fields)
            .field("references", &self.references)
            .field("list", &self.list)
            .finish()
    }
}

impl PartialEq for RelationMeta {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.name == other.name
    }
}

/// A model.
pub struct ModelMeta {
    /// Model name in the schema.
    pub name: &'static str,
    /// Table name in the database.
    pub table: &'static str,
    /// Scalar fields in declaration order.
    pub fields: &'static [FieldMeta],
    /// Relation fields in declaration order.
    pub relations: &'static [&'static RelationMeta],
    /// Field names identifying a row (the id, or the first unique criterion).
    pub primary_key: &'static [&'static str],
}

impl ModelMeta {
    /// Look up a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a scalar field by database column.
    pub fn field_by_column(&self, column: &str) -> Option<&'static FieldMeta> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Look up a relation field by name.
    pub fn relation(&self, name: &str) -> Option<&'static RelationMeta> {
        self.relations.iter().copied().find(|r| r.name == name)
    }

    /// The identifying fields.
    pub fn primary_key_fields(&self) -> Vec<&'static FieldMeta> {
        self.primary_key
            .iter()
            .filter_map(|name| self.field(name))
            .collect()
    }

    /// Whether any relation is a list.
    pub fn has_list_relations(&self) -> bool {
        self.relations.iter().any(|r| r.list)
    }
}

impl fmt::Debug for ModelMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMeta")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("fields", &self.fields.len())
            .field("relations", &self.relations.len())
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_models::{post, user};

    #[test]
    fn test_field_lookup() {
        let email = user::META.field("email").unwrap();
        assert!(email.unique);
        assert!(email.optional);
        assert!(user::META.field("posts").is_none());
    }

    #[test]
    fn test_relation_lookup() {
        let posts = user::META.relation("posts").unwrap();
        assert!(posts.list);
        assert_eq!(posts.target.name, "Post");
        assert_eq!(
            posts.join_pairs().collect::<Vec<_>>(),
            vec![("id", "createdById")]
        );

        let created_by = post::META.relation("createdBy").unwrap();
        assert!(!created_by.list);
        assert_eq!(created_by.target.table, "User");
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let text = format!("{:?}", user::META.relation("posts").unwrap());
        assert!(text.contains("target: \"Post\""));
    }

    #[test]
    fn test_list_relations() {
        assert!(user::META.has_list_relations());
        assert!(!post::META.has_list_relations());
    }
}
