//! Attribute definitions for the schema AST.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{Ident, Span};

/// An attribute argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// A string literal.
    String(String),
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A boolean literal.
    Boolean(bool),
    /// An identifier/constant reference (e.g., `Cascade`).
    Ident(SmolStr),
    /// A function call (e.g., `now()`, `env("DATABASE_URL")`).
    Function(SmolStr, Vec<AttributeValue>),
    /// An array of values.
    Array(Vec<AttributeValue>),
    /// A list of field references (e.g., `[provider, providerAccountId]`).
    FieldRefList(Vec<SmolStr>),
}

impl AttributeValue {
    /// Try to get the value as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the value as an identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(s) => Some(s),
            _ => None,
        }
    }

    /// Field names of a `[a, b]` list. A single-element list parses the same way.
    pub fn as_field_refs(&self) -> Option<&[SmolStr]> {
        match self {
            Self::FieldRefList(refs) => Some(refs),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{}\"", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Ident(s) => f.write_str(s),
            Self::Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
            Self::FieldRefList(refs) => write!(f, "[{}]", refs.join(", ")),
        }
    }
}

/// An attribute argument (named or positional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeArg {
    /// Argument name (None for positional arguments).
    pub name: Option<Ident>,
    /// Argument value.
    pub value: AttributeValue,
    /// Source location.
    pub span: Span,
}

impl AttributeArg {
    /// Create a positional argument.
    pub fn positional(value: AttributeValue, span: Span) -> Self {
        Self {
            name: None,
            value,
            span,
        }
    }

    /// Create a named argument.
    pub fn named(name: Ident, value: AttributeValue, span: Span) -> Self {
        Self {
            name: Some(name),
            value,
            span,
        }
    }
}

impl std::fmt::Display for AttributeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// An attribute applied to a field (`@name`) or model (`@@name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name without the `@` prefix; native types keep their
    /// namespace (`db.Text`).
    pub name: Ident,
    /// Attribute arguments.
    pub args: Vec<AttributeArg>,
    /// Source location (including `@`).
    pub span: Span,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(name: Ident, args: Vec<AttributeArg>, span: Span) -> Self {
        Self { name, args, span }
    }

    /// Create an attribute with no arguments.
    pub fn simple(name: Ident, span: Span) -> Self {
        Self {
            name,
            args: vec![],
            span,
        }
    }

    /// Get the attribute name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Check if this attribute has the given name.
    pub fn is(&self, name: &str) -> bool {
        self.name.as_str() == name
    }

    /// Get the first positional argument.
    pub fn first_arg(&self) -> Option<&AttributeValue> {
        self.args
            .iter()
            .find(|a| a.name.is_none())
            .map(|a| &a.value)
    }

    /// Get a named argument by name.
    pub fn get_arg(&self, name: &str) -> Option<&AttributeValue> {
        self.args
            .iter()
            .find(|a| a.name.as_ref().map(|n| n.as_str()) == Some(name))
            .map(|a| &a.value)
    }

    /// Field list of `@@id`, `@@unique` and `@@index`, positional or `fields:`.
    pub fn field_list(&self) -> Option<&[SmolStr]> {
        self.first_arg()
            .or_else(|| self.get_arg("fields"))
            .and_then(AttributeValue::as_field_refs)
    }

    /// Render the attribute arguments, e.g. `(fields: [a], references: [b])`.
    pub fn args_to_string(&self) -> String {
        if self.args.is_empty() {
            return String::new();
        }
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        format!("({})", args.join(", "))
    }
}

/// A `@default(...)` expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// `autoincrement()`: assigned by the database.
    Autoincrement,
    /// `now()`: current timestamp at insert.
    Now,
    /// `uuid()`: random v4 UUID at insert.
    Uuid,
    /// A literal value.
    Literal(AttributeValue),
    /// A function this generator does not know.
    Unknown(SmolStr),
}

impl DefaultValue {
    /// Classify a `@default` argument.
    pub fn from_value(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Function(name, _) => match name.as_str() {
                "autoincrement" => Self::Autoincrement,
                "now" => Self::Now,
                "uuid" => Self::Uuid,
                _ => Self::Unknown(name.clone()),
            },
            other => Self::Literal(other.clone()),
        }
    }
}

/// Structured view over a field's attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttributes {
    /// This field is the primary key.
    pub is_id: bool,
    /// This field has a unique constraint.
    pub is_unique: bool,
    /// This field is refreshed on every update.
    pub is_updated_at: bool,
    /// Default value expression.
    pub default: Option<DefaultValue>,
    /// Database column name mapping.
    pub map: Option<String>,
    /// Native database type (e.g., `@db.Text`).
    pub native_type: Option<SmolStr>,
    /// Relation attribute details.
    pub relation: Option<RelationAttribute>,
}

/// Relation attribute details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationAttribute {
    /// Relation name (for disambiguation).
    pub name: Option<String>,
    /// Fields on this model that reference the other model.
    pub fields: Vec<SmolStr>,
    /// Fields on the other model being referenced.
    pub references: Vec<SmolStr>,
    /// On delete action.
    pub on_delete: Option<ReferentialAction>,
    /// On update action.
    pub on_update: Option<ReferentialAction>,
}

impl RelationAttribute {
    /// The side holding the foreign key declares `fields`.
    pub fn is_owning(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Referential actions for relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// Cascade the operation.
    Cascade,
    /// Restrict the operation (error if references exist).
    Restrict,
    /// No action (deferred check).
    NoAction,
    /// Set to null.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ReferentialAction {
    /// Parse from the schema spelling.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Cascade" => Some(Self::Cascade),
            "Restrict" => Some(Self::Restrict),
            "NoAction" => Some(Self::NoAction),
            "SetNull" => Some(Self::SetNull),
            "SetDefault" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// SQL spelling of the action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::default())
    }

    #[test]
    fn test_attribute_value_accessors() {
        assert_eq!(AttributeValue::String("x".into()).as_string(), Some("x"));
        assert_eq!(AttributeValue::Int(7).as_int(), Some(7));
        assert_eq!(AttributeValue::Boolean(true).as_bool(), Some(true));
        assert_eq!(AttributeValue::Ident("Cascade".into()).as_ident(), Some("Cascade"));
        assert_eq!(AttributeValue::Int(7).as_string(), None);
    }

    #[test]
    fn test_attribute_value_display() {
        let value = AttributeValue::Function(
            "env".into(),
            vec![AttributeValue::String("DATABASE_URL".into())],
        );
        assert_eq!(value.to_string(), "env(\"DATABASE_URL\")");
        let refs = AttributeValue::FieldRefList(vec!["cursor".into(), "twitterUserId".into()]);
        assert_eq!(refs.to_string(), "[cursor, twitterUserId]");
    }

    #[test]
    fn test_attribute_named_and_positional_args() {
        let attr = Attribute::new(
            ident("relation"),
            vec![
                AttributeArg::positional(AttributeValue::String("Author".into()), Span::default()),
                AttributeArg::named(
                    ident("fields"),
                    AttributeValue::FieldRefList(vec!["createdById".into()]),
                    Span::default(),
                ),
            ],
            Span::default(),
        );
        assert_eq!(attr.first_arg().and_then(|v| v.as_string()), Some("Author"));
        assert!(attr.get_arg("fields").is_some());
        assert!(attr.get_arg("references").is_none());
        assert_eq!(
            attr.args_to_string(),
            "(\"Author\", fields: [createdById])"
        );
    }

    #[test]
    fn test_field_list_positional_or_named() {
        let positional = Attribute::new(
            ident("unique"),
            vec![AttributeArg::positional(
                AttributeValue::FieldRefList(vec!["identifier".into(), "token".into()]),
                Span::default(),
            )],
            Span::default(),
        );
        assert_eq!(positional.field_list().map(|f| f.len()), Some(2));

        let named = Attribute::new(
            ident("index"),
            vec![AttributeArg::named(
                ident("fields"),
                AttributeValue::FieldRefList(vec!["name".into()]),
                Span::default(),
            )],
            Span::default(),
        );
        assert_eq!(named.field_list().map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_default_value_classification() {
        let call = |name: &str| AttributeValue::Function(name.into(), vec![]);
        assert_eq!(DefaultValue::from_value(&call("autoincrement")), DefaultValue::Autoincrement);
        assert_eq!(DefaultValue::from_value(&call("now")), DefaultValue::Now);
        assert_eq!(DefaultValue::from_value(&call("uuid")), DefaultValue::Uuid);
        assert_eq!(
            DefaultValue::from_value(&call("cuid")),
            DefaultValue::Unknown("cuid".into())
        );
        assert_eq!(
            DefaultValue::from_value(&AttributeValue::Int(0)),
            DefaultValue::Literal(AttributeValue::Int(0))
        );
    }

    #[test]
    fn test_referential_action() {
        assert_eq!(ReferentialAction::from_str("Cascade"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::SetNull.as_sql(), "SET NULL");
        assert_eq!(ReferentialAction::from_str("Explode"), None);
    }
}
