//! Top-level schema definition.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{Datasource, Generator, Ident, Model, Relation};

/// A complete schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// `datasource` blocks.
    pub datasources: Vec<Datasource>,
    /// `generator` blocks.
    pub generators: Vec<Generator>,
    /// All models in the schema, in declaration order.
    pub models: IndexMap<SmolStr, Model>,
    /// Model names declared more than once; the first declaration wins.
    #[serde(skip)]
    pub duplicate_models: Vec<Ident>,
    /// Resolved relations (populated after validation).
    pub relations: Vec<Relation>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model to the schema. A repeated name is recorded, not inserted.
    pub fn add_model(&mut self, model: Model) {
        if self.models.contains_key(model.name()) {
            self.duplicate_models.push(model.name);
        } else {
            self.models.insert(model.name.name.clone(), model);
        }
    }

    /// Get a model by name.
    pub fn get_model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Get a mutable model by name.
    pub fn get_model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.get_mut(name)
    }

    /// Get all model names.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|s| s.as_str())
    }

    /// The first datasource block, if any.
    pub fn datasource(&self) -> Option<&Datasource> {
        self.datasources.first()
    }

    /// Relations declared on a model's fields.
    pub fn relations_from(&self, model: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.from_model == model)
            .collect()
    }

    /// Relations that point at a model.
    pub fn relations_to(&self, model: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.to_model == model)
            .collect()
    }

    /// The resolved relation behind a relation field.
    pub fn relation_for_field(&self, model: &str, field: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.from_model == model && r.from_field == field)
    }
}

/// Schema statistics for debugging/info.
#[derive(Debug, Clone, Default)]
pub struct SchemaStats {
    /// Number of models.
    pub model_count: usize,
    /// Total number of fields across all models.
    pub field_count: usize,
    /// Number of relation fields.
    pub relation_count: usize,
}

impl Schema {
    /// Get statistics about the schema.
    pub fn stats(&self) -> SchemaStats {
        SchemaStats {
            model_count: self.models.len(),
            field_count: self.models.values().map(|m| m.fields.len()).sum(),
            relation_count: self.relations.len(),
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "Schema({} models, {} fields, {} relations)",
            stats.model_count, stats.field_count, stats.relation_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{RelationType, Span};

    fn model(name: &str) -> Model {
        Model::new(Ident::new(name, Span::default()), Span::default())
    }

    #[test]
    fn test_add_and_lookup_models() {
        let mut schema = Schema::new();
        schema.add_model(model("User"));
        schema.add_model(model("Post"));

        assert!(schema.get_model("User").is_some());
        assert!(schema.get_model("Comment").is_none());
        assert_eq!(schema.model_names().collect::<Vec<_>>(), vec!["User", "Post"]);
    }

    #[test]
    fn test_duplicate_model_is_recorded() {
        let mut schema = Schema::new();
        schema.add_model(model("User"));
        schema.add_model(model("User"));
        assert_eq!(schema.models.len(), 1);
        assert_eq!(schema.duplicate_models.len(), 1);
    }

    #[test]
    fn test_relation_lookup() {
        let mut schema = Schema::new();
        schema
            .relations
            .push(Relation::new("Post", "createdBy", "User", RelationType::ManyToOne));
        schema
            .relations
            .push(Relation::new("User", "posts", "Post", RelationType::OneToMany));

        assert_eq!(schema.relations_from("Post").len(), 1);
        assert_eq!(schema.relations_to("Post").len(), 1);
        assert!(schema.relation_for_field("User", "posts").is_some());
        assert_eq!(schema.to_string(), "Schema(0 models, 0 fields, 2 relations)");
    }
}
