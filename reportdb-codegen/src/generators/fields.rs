//! Field module generation.
//!
//! Every scalar field gets a module of filter and ordering functions
//! (`tweet::like_count::gt(10)`, `tweet::tweeted_at::desc()`), all
//! delegating to a typed `FieldHandle`.

use proc_macro2::{Ident, TokenStream};
use quote::quote;

use reportdb_schema::ast::{Field, ScalarType};

use super::{generate_doc_comment, pascal_ident, snake_ident};
use crate::types::scalar_to_rust_type;

/// Generate the filter/order module of one scalar field.
pub fn generate_field_module(field: &Field, model: &Ident) -> TokenStream {
    let Some(scalar) = field.scalar_type() else {
        return TokenStream::new();
    };
    let module = snake_ident(field.name());
    let variant = pascal_ident(field.name());
    let column = field.column_name();
    let ty = scalar_to_rust_type(scalar);
    let doc = generate_doc_comment(field.documentation.as_ref().map(|d| d.text.as_str()));
    let filter = quote! { ::reportdb_query::Where<super::#model> };
    let order = quote! { ::reportdb_query::OrderBy<super::#model> };

    let mut functions = Vec::new();

    if scalar == ScalarType::Json {
        functions.push(json_functions(model, &filter));
    } else {
        functions.push(quote! {
            /// Equals `value`.
            pub fn equals(value: impl Into<#ty>) -> #filter {
                FIELD.equals(value)
            }

            /// Differs from `value`.
            pub fn not(value: impl Into<#ty>) -> #filter {
                FIELD.not(value)
            }
        });
        if scalar != ScalarType::Boolean {
            functions.push(quote! {
                /// One of `values`.
                pub fn in_(values: impl IntoIterator<Item = impl Into<#ty>>) -> #filter {
                    FIELD.in_(values)
                }

                /// None of `values`.
                pub fn not_in(values: impl IntoIterator<Item = impl Into<#ty>>) -> #filter {
                    FIELD.not_in(values)
                }

                /// Less than `value`.
                pub fn lt(value: impl Into<#ty>) -> #filter {
                    FIELD.lt(value)
                }

                /// Less than or equal to `value`.
                pub fn lte(value: impl Into<#ty>) -> #filter {
                    FIELD.lte(value)
                }

                /// Greater than `value`.
                pub fn gt(value: impl Into<#ty>) -> #filter {
                    FIELD.gt(value)
                }

                /// Greater than or equal to `value`.
                pub fn gte(value: impl Into<#ty>) -> #filter {
                    FIELD.gte(value)
                }
            });
        }
        if scalar == ScalarType::String {
            functions.push(string_functions(&filter));
        }
        functions.push(quote! {
            /// Ascending order.
            pub fn asc() -> #order {
                ::reportdb_query::OrderBy::asc(super::ScalarField::#variant)
            }

            /// Descending order.
            pub fn desc() -> #order {
                ::reportdb_query::OrderBy::desc(super::ScalarField::#variant)
            }
        });
    }

    if field.is_optional() {
        functions.push(quote! {
            /// The field is `NULL`.
            pub fn is_null() -> #filter {
                FIELD.is_null()
            }

            /// The field is not `NULL`.
            pub fn is_not_null() -> #filter {
                FIELD.is_not_null()
            }
        });
    }

    quote! {
        #doc
        pub mod #module {
            const FIELD: ::reportdb_query::FieldHandle<super::#model, #ty> =
                ::reportdb_query::FieldHandle::new(#column);

            #(#functions)*
        }
    }
}

fn string_functions(filter: &TokenStream) -> TokenStream {
    quote! {
        /// Contains `value`.
        pub fn contains(value: impl Into<String>) -> #filter {
            FIELD.contains(value)
        }

        /// Starts with `value`.
        pub fn starts_with(value: impl Into<String>) -> #filter {
            FIELD.starts_with(value)
        }

        /// Ends with `value`.
        pub fn ends_with(value: impl Into<String>) -> #filter {
            FIELD.ends_with(value)
        }

        /// Case-insensitive `equals`.
        pub fn equals_insensitive(value: impl Into<String>) -> #filter {
            FIELD.equals_insensitive(value)
        }

        /// Case-insensitive `not`.
        pub fn not_insensitive(value: impl Into<String>) -> #filter {
            FIELD.not_insensitive(value)
        }

        /// Case-insensitive `in_`.
        pub fn in_insensitive(values: impl IntoIterator<Item = impl Into<String>>) -> #filter {
            FIELD.in_insensitive(values)
        }

        /// Case-insensitive `contains`.
        pub fn contains_insensitive(value: impl Into<String>) -> #filter {
            FIELD.contains_insensitive(value)
        }

        /// Case-insensitive `starts_with`.
        pub fn starts_with_insensitive(value: impl Into<String>) -> #filter {
            FIELD.starts_with_insensitive(value)
        }

        /// Case-insensitive `ends_with`.
        pub fn ends_with_insensitive(value: impl Into<String>) -> #filter {
            FIELD.ends_with_insensitive(value)
        }
    }
}

fn json_functions(model: &Ident, filter: &TokenStream) -> TokenStream {
    quote! {
        /// Compare the value at `path` inside the document.
        pub fn path(path: impl IntoIterator<Item = impl Into<String>>) -> ::reportdb_query::JsonPath<super::#model> {
            FIELD.path(path)
        }

        /// The document equals `value`.
        pub fn equals(value: impl Into<::serde_json::Value>) -> #filter {
            FIELD.equals(value)
        }

        /// The document differs from `value`.
        pub fn not(value: impl Into<::serde_json::Value>) -> #filter {
            FIELD.not(value)
        }

        /// The document is a string containing `value`.
        pub fn string_contains(value: impl Into<String>) -> #filter {
            FIELD.string_contains(value)
        }

        /// The document is a string starting with `value`.
        pub fn string_starts_with(value: impl Into<String>) -> #filter {
            FIELD.string_starts_with(value)
        }

        /// The document is a string ending with `value`.
        pub fn string_ends_with(value: impl Into<String>) -> #filter {
            FIELD.string_ends_with(value)
        }

        /// The document is an array containing `value`.
        pub fn array_contains(value: impl Into<::serde_json::Value>) -> #filter {
            FIELD.array_contains(value)
        }
    }
}
