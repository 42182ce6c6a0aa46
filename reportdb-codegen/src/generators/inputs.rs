//! Write inputs and unique lookups of a model.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use reportdb_schema::ast::{DefaultValue, Field, Model};

use super::{pascal_ident, snake_ident};
use crate::types::scalar_to_rust_type;

/// Whether a create input may leave the field unset.
fn create_optional(field: &Field) -> bool {
    field.is_optional() || field.has_default()
}

fn is_autoincrement(field: &Field) -> bool {
    matches!(field.default_value(), Some(DefaultValue::Autoincrement))
}

/// `CreateInput`, its `CreateData` impl and the conversion from the payload.
pub fn generate_create_input(model: &Model, payload: &Ident) -> TokenStream {
    let fields = model.scalar_fields();

    let declarations = fields.iter().filter_map(|field| {
        let name = snake_ident(field.name());
        let ty = scalar_to_rust_type(field.scalar_type()?);
        Some(if create_optional(field) {
            quote! { pub #name: Option<#ty> }
        } else {
            quote! { pub #name: #ty }
        })
    });

    let pushes = fields.iter().map(|field| {
        let name = snake_ident(field.name());
        let key = field.name();
        if create_optional(field) {
            quote! {
                if let Some(v) = self.#name {
                    values.push((#key, v.into()));
                }
            }
        } else {
            quote! { values.push((#key, self.#name.into())); }
        }
    });

    let conversions = fields.iter().map(|field| {
        let name = snake_ident(field.name());
        if is_autoincrement(field) {
            quote! { #name: None }
        } else if create_optional(field) && !field.is_optional() {
            quote! { #name: Some(payload.#name) }
        } else {
            quote! { #name: payload.#name }
        }
    });

    quote! {
        /// Unchecked create input: foreign keys are plain scalar fields.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct CreateInput {
            #(#declarations,)*
        }

        impl ::reportdb_query::CreateData for CreateInput {
            fn into_values(self) -> Vec<(&'static str, ::reportdb_query::FilterValue)> {
                let mut values = Vec::new();
                #(#pushes)*
                values
            }
        }

        /// Server-generated autoincrement ids are dropped.
        impl From<#payload> for CreateInput {
            fn from(payload: #payload) -> Self {
                Self {
                    #(#conversions,)*
                }
            }
        }
    }
}

/// `UpdateInput` and its `UpdateData` impl.
pub fn generate_update_input(model: &Model) -> TokenStream {
    let fields = model.scalar_fields();

    let declarations = fields.iter().filter_map(|field| {
        let name = snake_ident(field.name());
        let scalar = field.scalar_type()?;
        let ty = scalar_to_rust_type(scalar);
        let value = if scalar.is_numeric() {
            quote! { ::reportdb_query::NumberUpdate<#ty> }
        } else {
            ty
        };
        Some(if field.is_optional() {
            quote! { pub #name: Option<Option<#value>> }
        } else {
            quote! { pub #name: Option<#value> }
        })
    });

    let pushes = fields.iter().filter_map(|field| {
        let name = snake_ident(field.name());
        let key = field.name();
        let scalar = field.scalar_type()?;
        let assignment = match (scalar.is_numeric(), field.is_optional()) {
            (true, true) => quote! {
                match v {
                    Some(update) => update.into(),
                    None => ::reportdb_query::Assignment::Set(::reportdb_query::FilterValue::Null),
                }
            },
            (true, false) => quote! { v.into() },
            (false, _) => quote! { ::reportdb_query::Assignment::Set(v.into()) },
        };
        Some(quote! {
            if let Some(v) = self.#name {
                assignments.push((#key, #assignment));
            }
        })
    });

    quote! {
        /// Update input: unset fields are left unchanged.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct UpdateInput {
            #(#declarations,)*
        }

        impl ::reportdb_query::UpdateData for UpdateInput {
            fn into_assignments(self) -> Vec<(&'static str, ::reportdb_query::Assignment)> {
                let mut assignments = Vec::new();
                #(#pushes)*
                assignments
            }
        }
    }
}

/// `UniqueWhere`: one variant per unique field and compound unique set.
pub fn generate_unique_where(model: &Model) -> TokenStream {
    let criteria = model.unique_criteria();

    let mut variants = Vec::new();
    let mut filters = Vec::new();
    let mut columns = Vec::new();

    for criterion in &criteria {
        let fields: Vec<&Field> = criterion
            .fields
            .iter()
            .filter_map(|name| model.get_field(name))
            .collect();
        let Some(types) = fields
            .iter()
            .map(|f| f.scalar_type().map(scalar_to_rust_type))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        let cols: Vec<String> = fields.iter().map(|f| f.column_name()).collect();

        if let [field] = fields.as_slice() {
            let variant = pascal_ident(field.name());
            let ty = &types[0];
            let col = &cols[0];
            variants.push(quote! { #variant(#ty) });
            filters.push(quote! {
                Self::#variant(v) => ::reportdb_query::Filter::Equals(#col.into(), v.into())
            });
            columns.push(quote! { Self::#variant(..) => &[#col] });
        } else {
            let variant = format_ident!(
                "{}",
                fields.iter().map(|f| pascal_ident(f.name()).to_string()).collect::<String>()
            );
            let names: Vec<Ident> = fields.iter().map(|f| snake_ident(f.name())).collect();
            variants.push(quote! { #variant { #(#names: #types),* } });
            filters.push(quote! {
                Self::#variant { #(#names),* } => ::reportdb_query::Filter::and([
                    #(::reportdb_query::Filter::Equals(#cols.into(), #names.into())),*
                ])
            });
            columns.push(quote! { Self::#variant { .. } => &[#(#cols),*] });
        }
    }

    quote! {
        /// Identifies exactly one record.
        #[derive(Debug, Clone, PartialEq)]
        pub enum UniqueWhere {
            #(#variants,)*
        }

        impl ::reportdb_query::UniqueFilter for UniqueWhere {
            fn into_filter(self) -> ::reportdb_query::Filter {
                match self {
                    #(#filters,)*
                }
            }

            fn columns(&self) -> &'static [&'static str] {
                match self {
                    #(#columns,)*
                }
            }
        }
    }
}
