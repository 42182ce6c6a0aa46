//! Code generation for one model module.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use reportdb_schema::ast::{Field, Model, Schema};

use super::fields::generate_field_module;
use super::inputs::{generate_create_input, generate_unique_where, generate_update_input};
use super::relations::{RelationInfo, generate_relation_meta, generate_relation_module, relation_infos};
use super::{generate_doc_comment, pascal_ident, snake_ident};
use crate::types::{default_kind, scalar_kind, scalar_to_rust_type};

/// Generate the complete module for a model.
pub fn generate_model_module(model: &Model, schema: &Schema) -> syn::Result<TokenStream> {
    let payload = pascal_ident(model.name());
    let module = snake_ident(model.name());
    let doc = generate_doc_comment(model.documentation.as_ref().map(|d| d.text.as_str()));

    let model_name = model.name();
    let table_name = model.table_name();
    let scalars = model.scalar_fields();
    let relations = relation_infos(model, schema)?;

    let field_count = scalars.len();
    let field_metas = scalars.iter().map(|field| generate_field_meta(field));
    let relation_metas = relations.iter().map(|info| generate_relation_meta(model, info));
    let relation_refs = relations.iter().map(|info| info.static_ident());
    let primary_key: Vec<String> = model.primary_key().iter().map(|f| f.to_string()).collect();

    let variants: Vec<_> = scalars.iter().map(|f| pascal_ident(f.name())).collect();
    let indices = 0..field_count;

    let count_output = generate_count_output(model, &relations);
    let payload_struct = generate_payload(model, &payload, &scalars, &relations);
    let unique_where = generate_unique_where(model);
    let create_input = generate_create_input(model, &payload);
    let update_input = generate_update_input(model);

    let field_modules = scalars.iter().map(|field| generate_field_module(field, &payload));
    let relation_modules = relations
        .iter()
        .map(|info| generate_relation_module(&payload, info));

    let filter = quote! { ::reportdb_query::Where<#payload> };

    Ok(quote! {
        #doc
        pub mod #module {
            use ::serde::{Deserialize, Serialize};

            /// Scalar field metadata, in declaration order.
            pub static FIELDS: [::reportdb_query::FieldMeta; #field_count] = [
                #(#field_metas,)*
            ];

            #(#relation_metas)*

            /// Model metadata.
            pub static META: ::reportdb_query::ModelMeta = ::reportdb_query::ModelMeta {
                name: #model_name,
                table: #table_name,
                fields: &FIELDS,
                relations: &[#(&#relation_refs),*],
                primary_key: &[#(#primary_key),*],
            };

            /// One variant per scalar field.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum ScalarField {
                #(#variants,)*
            }

            impl ScalarField {
                /// Every scalar field, in declaration order.
                pub const ALL: [ScalarField; #field_count] = [#(Self::#variants),*];
            }

            impl ::reportdb_query::ScalarFieldEnum for ScalarField {
                fn meta(&self) -> &'static ::reportdb_query::FieldMeta {
                    match self {
                        #(Self::#variants => &FIELDS[#indices],)*
                    }
                }
            }

            #count_output

            #payload_struct

            #unique_where

            #create_input

            #update_input

            impl ::reportdb_query::Model for #payload {
                const MODEL_NAME: &'static str = #model_name;
                const TABLE_NAME: &'static str = #table_name;

                type ScalarField = ScalarField;
                type UniqueWhere = UniqueWhere;
                type CreateInput = CreateInput;
                type UpdateInput = UpdateInput;

                fn meta() -> &'static ::reportdb_query::ModelMeta {
                    &META
                }
            }

            /// All conditions must hold.
            pub fn and(conditions: impl IntoIterator<Item = #filter>) -> #filter {
                ::reportdb_query::Where::and(conditions)
            }

            /// At least one condition must hold.
            pub fn or(conditions: impl IntoIterator<Item = #filter>) -> #filter {
                ::reportdb_query::Where::or(conditions)
            }

            /// None of the conditions may hold.
            pub fn not(conditions: impl IntoIterator<Item = #filter>) -> #filter {
                ::reportdb_query::Where::not(conditions)
            }

            #(#field_modules)*

            #(#relation_modules)*
        }
    })
}

fn generate_field_meta(field: &Field) -> TokenStream {
    let name = field.name();
    let column = field.column_name();
    let kind = field
        .scalar_type()
        .map(scalar_kind)
        .unwrap_or_else(|| quote! { ::reportdb_query::ScalarKind::String });
    let optional = field.is_optional();
    let id = field.is_id();
    let unique = field.is_unique();
    let updated_at = field.has_attribute("updatedAt");
    let default = default_kind(field);

    quote! {
        ::reportdb_query::FieldMeta {
            name: #name,
            column: #column,
            kind: #kind,
            optional: #optional,
            id: #id,
            unique: #unique,
            updated_at: #updated_at,
            default: #default,
        }
    }
}

/// The `_count` output type, for models with list relations.
fn generate_count_output(model: &Model, relations: &[RelationInfo<'_>]) -> TokenStream {
    if !model.has_list_relations() {
        return TokenStream::new();
    }
    let ident = format_ident!("{}Count", pascal_ident(model.name()));
    let fields = relations.iter().filter(|info| info.is_list()).map(|info| {
        let name = snake_ident(info.field.name());
        let key = info.field.name();
        quote! {
            #[serde(rename = #key)]
            pub #name: i64
        }
    });

    quote! {
        /// Number of related records per list relation.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct #ident {
            #(#fields,)*
        }
    }
}

fn generate_payload(
    model: &Model,
    payload: &proc_macro2::Ident,
    scalars: &[&Field],
    relations: &[RelationInfo<'_>],
) -> TokenStream {
    let doc = generate_doc_comment(model.documentation.as_ref().map(|d| d.text.as_str()));
    let table = model.table_name();
    let table_doc = format!("A row of the `{}` table.", table);

    let scalar_fields = scalars.iter().filter_map(|field| {
        let name = snake_ident(field.name());
        let key = field.name();
        let base = scalar_to_rust_type(field.scalar_type()?);
        let ty = if field.is_optional() {
            quote! { Option<#base> }
        } else {
            base
        };
        let field_doc = generate_doc_comment(field.documentation.as_ref().map(|d| d.text.as_str()));
        Some(quote! {
            #field_doc
            #[serde(rename = #key)]
            pub #name: #ty
        })
    });

    let relation_fields = relations.iter().map(|info| {
        let name = snake_ident(info.field.name());
        let key = info.field.name();
        let target = info.target_path();
        let ty = if info.is_list() {
            quote! { Option<Vec<#target>> }
        } else {
            quote! { Option<Box<#target>> }
        };
        quote! {
            /// Filled only when included.
            #[serde(rename = #key, skip_serializing_if = "Option::is_none")]
            pub #name: #ty
        }
    });

    let count_field = if model.has_list_relations() {
        let ident = format_ident!("{}Count", payload);
        quote! {
            /// Filled only when a relation count is included.
            #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
            pub _count: Option<#ident>,
        }
    } else {
        TokenStream::new()
    };

    quote! {
        #doc
        #[doc = #table_doc]
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct #payload {
            #(#scalar_fields,)*
            #(#relation_fields,)*
            #count_field
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportdb_schema::validate_schema;

    const SCHEMA: &str = r#"
        model User {
            id    String  @id @default(uuid())
            email String? @unique
            posts Post[]
        }

        model Post {
            id       Int    @id @default(autoincrement())
            title    String
            author   User   @relation(fields: [authorId], references: [id])
            authorId String
        }
    "#;

    fn generate(name: &str) -> String {
        let schema = validate_schema(SCHEMA).unwrap();
        let model = schema.get_model(name).unwrap();
        generate_model_module(model, &schema).unwrap().to_string()
    }

    #[test]
    fn test_generate_model_module() {
        let code = generate("User");
        assert!(code.contains("pub mod user"));
        assert!(code.contains("pub struct User"));
        assert!(code.contains("pub static META"));
        assert!(code.contains("pub enum ScalarField"));
        assert!(code.contains("pub struct CreateInput"));
        assert!(code.contains("pub struct UpdateInput"));
        assert!(code.contains("pub enum UniqueWhere"));
    }

    #[test]
    fn test_count_output_only_with_list_relations() {
        let user = generate("User");
        assert!(user.contains("pub struct UserCount"));
        assert!(user.contains("pub _count : Option < UserCount >"));

        let post = generate("Post");
        assert!(!post.contains("PostCount"));
        assert!(!post.contains("_count"));
    }

    #[test]
    fn test_relation_modules() {
        let user = generate("User");
        assert!(user.contains("pub mod posts"));
        assert!(user.contains("pub fn some"));
        assert!(user.contains("pub fn order_by_count"));

        let post = generate("Post");
        assert!(post.contains("pub mod author"));
        assert!(post.contains("pub fn is"));
        assert!(post.contains("pub mod author_id"));
        assert!(post.contains("target : & super :: user :: META"));
    }

    #[test]
    fn test_metadata_defaults() {
        let post = generate("Post");
        assert!(post.contains("DefaultKind :: Autoincrement"));
        let user = generate("User");
        assert!(user.contains("DefaultKind :: Uuid"));
        assert!(user.contains("primary_key : & [\"id\"]"));
    }
}
