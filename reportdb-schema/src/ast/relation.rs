//! Relation analysis for the schema AST.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::ReferentialAction;

/// The type of relation between two models, seen from the declaring field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationType {
    /// One-to-one relation.
    OneToOne,
    /// One-to-many relation (the field is a list).
    OneToMany,
    /// Many-to-one relation (the field holds the foreign key).
    ManyToOne,
}

impl RelationType {
    /// Check if this is a "to-one" relation.
    pub fn is_to_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Check if this is a "to-many" relation.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Self::OneToMany)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneToOne => write!(f, "1:1"),
            Self::OneToMany => write!(f, "1:n"),
            Self::ManyToOne => write!(f, "n:1"),
        }
    }
}

/// A resolved relation field.
///
/// Both sides of a relation produce a record: the owning side (which
/// declares `@relation(fields, references)`) and the back-relation. For the
/// back-relation, `from_fields`/`to_fields` are mirrored from the owner so
/// that a join always reads `from_model.from_fields = to_model.to_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Relation name (for disambiguation when multiple relations exist).
    pub name: Option<SmolStr>,
    /// The model declaring the field.
    pub from_model: SmolStr,
    /// The relation field on the from model.
    pub from_field: SmolStr,
    /// Join columns on the from model.
    pub from_fields: Vec<SmolStr>,
    /// The model being referenced.
    pub to_model: SmolStr,
    /// The opposite relation field on the target model.
    pub to_field: Option<SmolStr>,
    /// Join columns on the target model.
    pub to_fields: Vec<SmolStr>,
    /// Relation type from the declaring side.
    pub relation_type: RelationType,
    /// Whether this side holds the foreign key.
    pub is_owner: bool,
    /// Whether the relation field is optional.
    pub is_optional: bool,
    /// On delete action.
    pub on_delete: Option<ReferentialAction>,
    /// On update action.
    pub on_update: Option<ReferentialAction>,
}

impl Relation {
    /// Create a new relation.
    pub fn new(
        from_model: impl Into<SmolStr>,
        from_field: impl Into<SmolStr>,
        to_model: impl Into<SmolStr>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            name: None,
            from_model: from_model.into(),
            from_field: from_field.into(),
            from_fields: vec![],
            to_model: to_model.into(),
            to_field: None,
            to_fields: vec![],
            relation_type,
            is_owner: false,
            is_optional: false,
            on_delete: None,
            on_update: None,
        }
    }

    /// Set the relation name.
    pub fn with_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the join columns on both sides.
    pub fn with_join(mut self, from_fields: Vec<SmolStr>, to_fields: Vec<SmolStr>) -> Self {
        self.from_fields = from_fields;
        self.to_fields = to_fields;
        self
    }

    /// Set the opposite relation field.
    pub fn with_to_field(mut self, field: impl Into<SmolStr>) -> Self {
        self.to_field = Some(field.into());
        self
    }

    /// Mark this side as owning the foreign key.
    pub fn owning(mut self) -> Self {
        self.is_owner = true;
        self
    }

    /// Mark the relation field optional.
    pub fn optional(mut self, optional: bool) -> Self {
        self.is_optional = optional;
        self
    }

    /// Set the on delete action.
    pub fn with_on_delete(mut self, action: Option<ReferentialAction>) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the on update action.
    pub fn with_on_update(mut self, action: Option<ReferentialAction>) -> Self {
        self.on_update = action;
        self
    }

    /// Whether the join spans more than one column.
    pub fn is_composite(&self) -> bool {
        self.from_fields.len() > 1
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {} ({})",
            self.from_model, self.from_field, self.to_model, self.relation_type
        )
    }
}
