//! Datasource and generator block definitions.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{AttributeValue, Ident, Span};

/// Database provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseProvider {
    /// PostgreSQL database.
    PostgreSQL,
}

impl DatabaseProvider {
    /// Parse a provider from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Some(Self::PostgreSQL),
            _ => None,
        }
    }

    /// Get the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "postgresql",
        }
    }
}

impl std::fmt::Display for DatabaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `key = value` line inside a datasource or generator block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Entry key.
    pub key: Ident,
    /// Entry value.
    pub value: AttributeValue,
    /// Source location.
    pub span: Span,
}

/// A connection URL, either inline or read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasourceUrl {
    /// A literal URL.
    Literal(String),
    /// `env("VAR")`.
    Env(SmolStr),
}

impl DatasourceUrl {
    /// Resolve the URL, reading the environment for `env(...)`.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::Literal(url) => Some(url.clone()),
            Self::Env(var) => std::env::var(var.as_str()).ok(),
        }
    }
}

/// A `datasource` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    /// Block name (`db`).
    pub name: Ident,
    /// All entries in declaration order.
    pub entries: Vec<ConfigEntry>,
    /// Source location.
    pub span: Span,
}

impl Datasource {
    /// Create an empty datasource block.
    pub fn new(name: Ident, span: Span) -> Self {
        Self {
            name,
            entries: vec![],
            span,
        }
    }

    /// Get an entry value by key.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|e| e.key.as_str() == key)
            .map(|e| &e.value)
    }

    /// The raw `provider` string.
    pub fn provider_name(&self) -> Option<&str> {
        self.get("provider").and_then(AttributeValue::as_string)
    }

    /// The parsed provider.
    pub fn provider(&self) -> Option<DatabaseProvider> {
        self.provider_name().and_then(DatabaseProvider::from_str)
    }

    /// The `url` entry.
    pub fn url(&self) -> Option<DatasourceUrl> {
        match self.get("url")? {
            AttributeValue::String(url) => Some(DatasourceUrl::Literal(url.clone())),
            AttributeValue::Function(name, args) if name == "env" => args
                .first()
                .and_then(AttributeValue::as_string)
                .map(|var| DatasourceUrl::Env(var.into())),
            _ => None,
        }
    }
}

/// A `generator` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Block name (`client`).
    pub name: Ident,
    /// All entries in declaration order.
    pub entries: Vec<ConfigEntry>,
    /// Source location.
    pub span: Span,
}

impl Generator {
    /// Create an empty generator block.
    pub fn new(name: Ident, span: Span) -> Self {
        Self {
            name,
            entries: vec![],
            span,
        }
    }

    /// Get an entry value by key.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|e| e.key.as_str() == key)
            .map(|e| &e.value)
    }

    /// The `output` entry.
    pub fn output(&self) -> Option<&str> {
        self.get("output").and_then(AttributeValue::as_string)
    }
}
