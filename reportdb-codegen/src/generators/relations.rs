//! Relation metadata and relation field modules.

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use reportdb_schema::ast::{Field, Model, Relation, Schema};

use super::{generate_doc_comment, pascal_ident, screaming_ident, snake_ident};

/// A relation field together with its resolved relation and target model.
pub struct RelationInfo<'a> {
    pub field: &'a Field,
    pub relation: &'a Relation,
    pub target: &'a Model,
}

impl RelationInfo<'_> {
    /// Name of the static `RelationMeta`.
    pub fn static_ident(&self) -> Ident {
        screaming_ident(self.field.name())
    }

    /// Path to the target payload, seen from inside the model module.
    pub fn target_path(&self) -> TokenStream {
        let module = snake_ident(self.target.name());
        let payload = pascal_ident(self.target.name());
        quote! { super::#module::#payload }
    }

    pub fn is_list(&self) -> bool {
        self.field.is_list()
    }
}

/// Resolve every relation field of `model`.
pub fn relation_infos<'a>(model: &'a Model, schema: &'a Schema) -> syn::Result<Vec<RelationInfo<'a>>> {
    model
        .relation_fields()
        .into_iter()
        .map(|field| {
            let relation = schema
                .relation_for_field(model.name(), field.name())
                .ok_or_else(|| error(format!("relation {}.{} is not resolved", model.name(), field.name())))?;
            let target = schema
                .get_model(&relation.to_model)
                .ok_or_else(|| error(format!("unknown model {} in {}.{}", relation.to_model, model.name(), field.name())))?;
            Ok(RelationInfo {
                field,
                relation,
                target,
            })
        })
        .collect()
}

fn error(message: String) -> syn::Error {
    syn::Error::new(Span::call_site(), message)
}

fn columns_of(model: &Model, fields: &[impl AsRef<str>]) -> Vec<String> {
    fields
        .iter()
        .map(|name| {
            model
                .get_field(name.as_ref())
                .map(Field::column_name)
                .unwrap_or_else(|| name.as_ref().to_string())
        })
        .collect()
}

/// The static `RelationMeta` of one relation field.
pub fn generate_relation_meta(model: &Model, info: &RelationInfo<'_>) -> TokenStream {
    let ident = info.static_ident();
    let name = info.field.name();
    let owner = model.name();
    let target_module = snake_ident(info.target.name());
    let fields: Vec<&str> = info.relation.from_fields.iter().map(|f| f.as_str()).collect();
    let columns = columns_of(model, &fields);
    let references: Vec<&str> = info.relation.to_fields.iter().map(|f| f.as_str()).collect();
    let reference_columns = columns_of(info.target, &references);
    let list = info.is_list();
    let optional = info.field.is_optional();

    quote! {
        pub static #ident: ::reportdb_query::RelationMeta = ::reportdb_query::RelationMeta {
            name: #name,
            model: #owner,
            target: &super::#target_module::META,
            fields: &[#(#fields),*],
            columns: &[#(#columns),*],
            references: &[#(#references),*],
            reference_columns: &[#(#reference_columns),*],
            list: #list,
            optional: #optional,
        };
    }
}

/// The filter/order/include module of one relation field.
pub fn generate_relation_module(payload: &Ident, info: &RelationInfo<'_>) -> TokenStream {
    let module = snake_ident(info.field.name());
    let meta = info.static_ident();
    let doc = generate_doc_comment(info.field.documentation.as_ref().map(|d| d.text.as_str()));
    let target_module = snake_ident(info.target.name());
    let target_payload = pascal_ident(info.target.name());
    let target = quote! { super::super::#target_module::#target_payload };
    let filter = quote! { ::reportdb_query::Where<super::#payload> };
    let target_filter = quote! { ::reportdb_query::Where<#target> };

    let quantifiers = if info.is_list() {
        quote! {
            /// At least one related record matches.
            pub fn some(filter: #target_filter) -> #filter {
                field().some(filter)
            }

            /// Every related record matches.
            pub fn every(filter: #target_filter) -> #filter {
                field().every(filter)
            }

            /// No related record matches.
            pub fn none(filter: #target_filter) -> #filter {
                field().none(filter)
            }

            /// Order by the number of related records.
            pub fn order_by_count(order: ::reportdb_query::SortOrder) -> ::reportdb_query::OrderBy<super::#payload> {
                field().order_by_count(order)
            }

            /// Count the related records into `_count`.
            pub fn count() -> ::reportdb_query::Include<super::#payload> {
                field().count()
            }
        }
    } else {
        let is_null = if info.field.is_optional() {
            quote! {
                /// No related record exists.
                pub fn is_null() -> #filter {
                    field().is_null()
                }
            }
        } else {
            TokenStream::new()
        };
        quote! {
            /// The related record matches.
            pub fn is(filter: #target_filter) -> #filter {
                field().is(filter)
            }

            /// The related record does not match.
            pub fn is_not(filter: #target_filter) -> #filter {
                field().is_not(filter)
            }

            #is_null

            /// Order by a field of the related record.
            pub fn order_by(order: ::reportdb_query::OrderBy<#target>) -> ::reportdb_query::OrderBy<super::#payload> {
                field().order_by(order)
            }
        }
    };

    quote! {
        #doc
        pub mod #module {
            fn field() -> ::reportdb_query::RelationField<super::#payload, #target> {
                ::reportdb_query::RelationField::new(&super::#meta)
            }

            #quantifiers

            /// Load the related records.
            pub fn include() -> ::reportdb_query::RelationInclude<super::#payload, #target> {
                field().include()
            }
        }
    }
}
