//! Field definitions for the schema AST.

use serde::{Deserialize, Serialize};

use super::{
    Attribute, AttributeValue, DefaultValue, Documentation, FieldAttributes, FieldType, Ident,
    ReferentialAction, RelationAttribute, ScalarType, Span, TypeModifier,
};

/// A field in a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: Ident,
    /// Field type.
    pub field_type: FieldType,
    /// Type modifier (optional, list).
    pub modifier: TypeModifier,
    /// Raw attributes as parsed.
    pub attributes: Vec<Attribute>,
    /// Documentation comment.
    pub documentation: Option<Documentation>,
    /// Source location.
    pub span: Span,
}

impl Field {
    /// Create a new field.
    pub fn new(
        name: Ident,
        field_type: FieldType,
        modifier: TypeModifier,
        attributes: Vec<Attribute>,
        span: Span,
    ) -> Self {
        Self {
            name,
            field_type,
            modifier,
            attributes,
            documentation: None,
            span,
        }
    }

    /// Get the field name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Check if the field is optional.
    pub fn is_optional(&self) -> bool {
        self.modifier.is_optional()
    }

    /// Check if the field is a list.
    pub fn is_list(&self) -> bool {
        self.modifier.is_list()
    }

    /// Check if this field has a specific attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.is(name))
    }

    /// Get an attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is(name))
    }

    /// Check if this is a primary key field.
    pub fn is_id(&self) -> bool {
        self.has_attribute("id")
    }

    /// Check if this field has a unique constraint.
    pub fn is_unique(&self) -> bool {
        self.has_attribute("unique")
    }

    /// Check if this is a relation field.
    pub fn is_relation(&self) -> bool {
        self.field_type.is_relation()
    }

    /// The scalar type, if this is a scalar field.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        self.field_type.as_scalar()
    }

    /// Database column name (`@map` or the field name).
    pub fn column_name(&self) -> String {
        self.get_attribute("map")
            .and_then(Attribute::first_arg)
            .and_then(AttributeValue::as_string)
            .map(String::from)
            .unwrap_or_else(|| self.name().to_string())
    }

    /// The parsed `@default` expression.
    pub fn default_value(&self) -> Option<DefaultValue> {
        self.get_attribute("default")
            .and_then(Attribute::first_arg)
            .map(DefaultValue::from_value)
    }

    /// Whether a create input may leave this field unset.
    pub fn has_default(&self) -> bool {
        self.has_attribute("default") || self.has_attribute("updatedAt")
    }

    /// Extract structured field attributes.
    pub fn extract_attributes(&self) -> FieldAttributes {
        let mut attrs = FieldAttributes::default();

        for attr in &self.attributes {
            match attr.name() {
                "id" => attrs.is_id = true,
                "unique" => attrs.is_unique = true,
                "updatedAt" => attrs.is_updated_at = true,
                "default" => {
                    attrs.default = attr.first_arg().map(DefaultValue::from_value);
                }
                "map" => {
                    attrs.map = attr
                        .first_arg()
                        .and_then(AttributeValue::as_string)
                        .map(String::from);
                }
                "relation" => attrs.relation = Some(relation_attribute(attr)),
                name if name.starts_with("db.") => {
                    attrs.native_type = Some(format!("{}{}", name, attr.args_to_string()).into());
                }
                _ => {}
            }
        }

        attrs
    }

    /// Set documentation.
    pub fn with_documentation(mut self, doc: Documentation) -> Self {
        self.documentation = Some(doc);
        self
    }
}

fn relation_attribute(attr: &Attribute) -> RelationAttribute {
    let action = |key: &str| {
        attr.get_arg(key)
            .and_then(AttributeValue::as_ident)
            .and_then(ReferentialAction::from_str)
    };

    RelationAttribute {
        name: attr
            .first_arg()
            .or_else(|| attr.get_arg("name"))
            .and_then(AttributeValue::as_string)
            .map(String::from),
        fields: attr
            .get_arg("fields")
            .and_then(AttributeValue::as_field_refs)
            .map(<[_]>::to_vec)
            .unwrap_or_default(),
        references: attr
            .get_arg("references")
            .and_then(AttributeValue::as_field_refs)
            .map(<[_]>::to_vec)
            .unwrap_or_default(),
        on_delete: action("onDelete"),
        on_update: action("onUpdate"),
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}{}", self.name, self.field_type, self.modifier.suffix())?;
        for attr in &self.attributes {
            write!(f, " @{}{}", attr.name, attr.args_to_string())?;
        }
        Ok(())
    }
}
