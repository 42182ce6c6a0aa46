//! Type mapping from schema types to Rust types.

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::quote;

use reportdb_schema::ast::{AttributeValue, DefaultValue, Field, ScalarType};

/// Convert a schema scalar type to its Rust type token stream.
pub fn scalar_to_rust_type(scalar: ScalarType) -> TokenStream {
    match scalar {
        ScalarType::Int => quote! { i32 },
        ScalarType::BigInt => quote! { i64 },
        ScalarType::Float => quote! { f64 },
        ScalarType::Boolean => quote! { bool },
        ScalarType::String => quote! { String },
        ScalarType::DateTime => quote! { ::chrono::DateTime<::chrono::Utc> },
        ScalarType::Json => quote! { ::serde_json::Value },
    }
}

/// The runtime `ScalarKind` variant for a scalar type.
pub fn scalar_kind(scalar: ScalarType) -> TokenStream {
    match scalar {
        ScalarType::Int => quote! { ::reportdb_query::ScalarKind::Int },
        ScalarType::BigInt => quote! { ::reportdb_query::ScalarKind::BigInt },
        ScalarType::Float => quote! { ::reportdb_query::ScalarKind::Float },
        ScalarType::Boolean => quote! { ::reportdb_query::ScalarKind::Boolean },
        ScalarType::String => quote! { ::reportdb_query::ScalarKind::String },
        ScalarType::DateTime => quote! { ::reportdb_query::ScalarKind::DateTime },
        ScalarType::Json => quote! { ::reportdb_query::ScalarKind::Json },
    }
}

/// The runtime `DefaultKind` for a field.
pub fn default_kind(field: &Field) -> TokenStream {
    match field.default_value() {
        Some(DefaultValue::Autoincrement) => quote! { ::reportdb_query::DefaultKind::Autoincrement },
        Some(DefaultValue::Now) => quote! { ::reportdb_query::DefaultKind::Now },
        Some(DefaultValue::Uuid) => quote! { ::reportdb_query::DefaultKind::Uuid },
        Some(DefaultValue::Literal(value)) => match literal_json(&value) {
            Some(json) => quote! { ::reportdb_query::DefaultKind::Literal(#json) },
            None => quote! { ::reportdb_query::DefaultKind::None },
        },
        Some(DefaultValue::Unknown(_)) | None => quote! { ::reportdb_query::DefaultKind::None },
    }
}

/// JSON text of a literal default value.
pub fn literal_json(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::String(s) => {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
            Some(format!("\"{}\"", escaped))
        }
        AttributeValue::Int(i) => Some(i.to_string()),
        AttributeValue::Float(f) if f.is_finite() => Some(f.to_string()),
        AttributeValue::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert a name to snake_case for module/function names.
pub fn to_snake_case(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Convert a name to PascalCase for type names.
pub fn to_pascal_case(name: &str) -> String {
    name.to_case(Case::Pascal)
}

/// Convert a name to SCREAMING_SNAKE_CASE for statics.
pub fn to_screaming_snake(name: &str) -> String {
    name.to_case(Case::ScreamingSnake)
}
