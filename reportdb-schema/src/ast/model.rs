//! Model definitions for the schema AST.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{Attribute, AttributeValue, Documentation, Field, Ident, Span};

/// A model definition (maps to a database table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    pub name: Ident,
    /// Model fields, in declaration order.
    pub fields: IndexMap<SmolStr, Field>,
    /// Model-level attributes (prefixed with `@@`).
    pub attributes: Vec<Attribute>,
    /// Documentation comment.
    pub documentation: Option<Documentation>,
    /// Field names declared more than once; the first declaration wins.
    #[serde(skip)]
    pub duplicate_fields: Vec<Ident>,
    /// Source location.
    pub span: Span,
}

/// How a unique criterion was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniqueKind {
    /// `@id` or `@@id`.
    Id,
    /// `@unique` or `@@unique`.
    Unique,
}

/// A set of fields that identifies at most one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueCriterion {
    /// Field names, in declaration order.
    pub fields: Vec<SmolStr>,
    /// Declaration kind.
    pub kind: UniqueKind,
}

impl UniqueCriterion {
    /// Whether this criterion spans more than one field.
    pub fn is_compound(&self) -> bool {
        self.fields.len() > 1
    }
}

/// A `@@index` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Indexed fields.
    pub fields: Vec<SmolStr>,
    /// Explicit index name (`name:` / `map:` argument).
    pub name: Option<String>,
}

impl Model {
    /// Create a new model.
    pub fn new(name: Ident, span: Span) -> Self {
        Self {
            name,
            fields: IndexMap::new(),
            attributes: vec![],
            documentation: None,
            duplicate_fields: vec![],
            span,
        }
    }

    /// Get the model name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Add a field to the model. A repeated name is recorded, not inserted.
    pub fn add_field(&mut self, field: Field) {
        if self.fields.contains_key(field.name()) {
            self.duplicate_fields.push(field.name);
        } else {
            self.fields.insert(field.name.name.clone(), field);
        }
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Get all relation fields.
    pub fn relation_fields(&self) -> Vec<&Field> {
        self.fields.values().filter(|f| f.is_relation()).collect()
    }

    /// Get all scalar (non-relation) fields.
    pub fn scalar_fields(&self) -> Vec<&Field> {
        self.fields.values().filter(|f| !f.is_relation()).collect()
    }

    /// Whether any relation field is a list (the model gets a `_count` output).
    pub fn has_list_relations(&self) -> bool {
        self.fields
            .values()
            .any(|f| f.is_relation() && f.is_list())
    }

    /// Check if this model has a specific model-level attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.is(name))
    }

    /// Get a model-level attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is(name))
    }

    /// Get the database table name (from `@@map` or model name).
    pub fn table_name(&self) -> &str {
        self.get_attribute("map")
            .and_then(Attribute::first_arg)
            .and_then(AttributeValue::as_string)
            .unwrap_or_else(|| self.name())
    }

    /// Every unique criterion, primary key first, then single-field
    /// `@unique`, then `@@unique` sets. Duplicates are dropped.
    pub fn unique_criteria(&self) -> Vec<UniqueCriterion> {
        let mut criteria: Vec<UniqueCriterion> = Vec::new();
        let mut push = |fields: Vec<SmolStr>, kind: UniqueKind| {
            if !fields.is_empty() && !criteria.iter().any(|c| c.fields == fields) {
                criteria.push(UniqueCriterion { fields, kind });
            }
        };

        for field in self.fields.values().filter(|f| f.is_id()) {
            push(vec![field.name.name.clone()], UniqueKind::Id);
        }
        for attr in self.attributes.iter().filter(|a| a.is("id")) {
            push(attr.field_list().unwrap_or_default().to_vec(), UniqueKind::Id);
        }
        for field in self.fields.values().filter(|f| f.is_unique()) {
            push(vec![field.name.name.clone()], UniqueKind::Unique);
        }
        for attr in self.attributes.iter().filter(|a| a.is("unique")) {
            push(
                attr.field_list().unwrap_or_default().to_vec(),
                UniqueKind::Unique,
            );
        }

        criteria
    }

    /// The identifying field set: `@id`/`@@id`, otherwise the first
    /// `@unique` field, otherwise the first `@@unique` set.
    pub fn primary_key(&self) -> Vec<SmolStr> {
        let criteria = self.unique_criteria();
        criteria
            .iter()
            .find(|c| c.kind == UniqueKind::Id)
            .or_else(|| criteria.iter().find(|c| !c.is_compound()))
            .or_else(|| criteria.first())
            .map(|c| c.fields.clone())
            .unwrap_or_default()
    }

    /// Whether the given field set is one of this model's unique criteria.
    pub fn is_unique_criterion(&self, fields: &[SmolStr]) -> bool {
        self.unique_criteria()
            .iter()
            .any(|c| c.fields.as_slice() == fields)
    }

    /// `@@index` declarations.
    pub fn indexes(&self) -> Vec<Index> {
        self.attributes
            .iter()
            .filter(|a| a.is("index"))
            .map(|a| Index {
                fields: a.field_list().unwrap_or_default().to_vec(),
                name: a
                    .get_arg("name")
                    .or_else(|| a.get_arg("map"))
                    .and_then(AttributeValue::as_string)
                    .map(String::from),
            })
            .collect()
    }

    /// Set documentation.
    pub fn with_documentation(mut self, doc: Documentation) -> Self {
        self.documentation = Some(doc);
        self
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "model {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AttributeArg, FieldType, ScalarType, TypeModifier};

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::default())
    }

    fn scalar(name: &str, ty: ScalarType, attrs: &[&str]) -> Field {
        Field::new(
            ident(name),
            FieldType::Scalar(ty),
            TypeModifier::Required,
            attrs
                .iter()
                .map(|a| Attribute::simple(ident(a), Span::default()))
                .collect(),
            Span::default(),
        )
    }

    fn model_attr(name: &str, fields: &[&str]) -> Attribute {
        Attribute::new(
            ident(name),
            vec![AttributeArg::positional(
                AttributeValue::FieldRefList(fields.iter().map(|f| SmolStr::new(f)).collect()),
                Span::default(),
            )],
            Span::default(),
        )
    }

    // ==========================================================================
    // Identity
    // ==========================================================================

    #[test]
    fn test_primary_key_from_id_field() {
        let mut model = Model::new(ident("Session"), Span::default());
        model.add_field(scalar("id", ScalarType::String, &["id"]));
        model.add_field(scalar("sessionToken", ScalarType::String, &["unique"]));

        assert_eq!(model.primary_key(), vec![SmolStr::new("id")]);
        assert_eq!(model.unique_criteria().len(), 2);
    }

    #[test]
    fn test_primary_key_falls_back_to_unique_field() {
        let mut model = Model::new(ident("VerificationToken"), Span::default());
        model.add_field(scalar("identifier", ScalarType::String, &[]));
        model.add_field(scalar("token", ScalarType::String, &["unique"]));
        model.add_field(scalar("expires", ScalarType::DateTime, &[]));
        model.attributes.push(model_attr("unique", &["identifier", "token"]));

        assert_eq!(model.primary_key(), vec![SmolStr::new("token")]);
        let criteria = model.unique_criteria();
        assert_eq!(criteria.len(), 2);
        assert!(criteria[1].is_compound());
    }

    #[test]
    fn test_primary_key_falls_back_to_compound_unique() {
        let mut model = Model::new(ident("LatestTweetsQuery"), Span::default());
        model.add_field(scalar("cursor", ScalarType::String, &[]));
        model.add_field(scalar("twitterUserId", ScalarType::String, &[]));
        model.attributes.push(model_attr("unique", &["cursor", "twitterUserId"]));

        assert_eq!(
            model.primary_key(),
            vec![SmolStr::new("cursor"), SmolStr::new("twitterUserId")]
        );
        assert!(model.is_unique_criterion(&["cursor".into(), "twitterUserId".into()]));
        assert!(!model.is_unique_criterion(&["cursor".into()]));
    }

    #[test]
    fn test_model_without_identifier() {
        let mut model = Model::new(ident("Loose"), Span::default());
        model.add_field(scalar("value", ScalarType::Int, &[]));
        assert!(model.primary_key().is_empty());
    }

    // ==========================================================================
    // Fields and attributes
    // ==========================================================================

    #[test]
    fn test_duplicate_field_is_recorded() {
        let mut model = Model::new(ident("User"), Span::default());
        model.add_field(scalar("email", ScalarType::String, &[]));
        model.add_field(scalar("email", ScalarType::Int, &[]));

        assert_eq!(model.fields.len(), 1);
        assert_eq!(model.duplicate_fields.len(), 1);
        assert_eq!(
            model.get_field("email").and_then(Field::scalar_type),
            Some(ScalarType::String)
        );
    }

    #[test]
    fn test_table_name_and_indexes() {
        let mut model = Model::new(ident("Post"), Span::default());
        model.add_field(scalar("name", ScalarType::String, &[]));
        model.attributes.push(model_attr("index", &["name"]));
        assert_eq!(model.table_name(), "Post");
        assert_eq!(model.indexes()[0].fields, vec![SmolStr::new("name")]);

        model.attributes.push(Attribute::new(
            ident("map"),
            vec![AttributeArg::positional(
                AttributeValue::String("posts".into()),
                Span::default(),
            )],
            Span::default(),
        ));
        assert_eq!(model.table_name(), "posts");
    }

    #[test]
    fn test_has_list_relations() {
        let mut model = Model::new(ident("TezosWallet"), Span::default());
        model.add_field(scalar("id", ScalarType::String, &["id"]));
        assert!(!model.has_list_relations());

        model.add_field(Field::new(
            ident("reports"),
            FieldType::Model("Report".into()),
            TypeModifier::List,
            vec![],
            Span::default(),
        ));
        assert!(model.has_list_relations());
        assert_eq!(model.relation_fields().len(), 1);
        assert_eq!(model.scalar_fields().len(), 1);
    }
}
