//! Code generators for the model modules and the client facade.

mod client;
mod fields;
mod inputs;
mod model;
mod relations;

pub use client::{generate_client, generate_model_name};
pub use model::generate_model_module;

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use crate::types::{to_pascal_case, to_screaming_snake, to_snake_case};

/// Generate documentation comment tokens from an optional doc string.
pub fn generate_doc_comment(doc: Option<&str>) -> TokenStream {
    match doc {
        Some(doc) => {
            let lines: Vec<_> = doc.lines().map(|line| line.trim()).collect();
            let doc_lines = lines.iter().map(|line| {
                quote! { #[doc = #line] }
            });
            quote! { #(#doc_lines)* }
        }
        None => TokenStream::new(),
    }
}

/// Generate a snake_case identifier from a name, escaping keywords.
pub fn snake_ident(name: &str) -> Ident {
    safe_ident(&to_snake_case(name))
}

/// Generate a PascalCase identifier from a name.
pub fn pascal_ident(name: &str) -> Ident {
    safe_ident(&to_pascal_case(name))
}

/// Generate a SCREAMING_SNAKE_CASE identifier from a name.
pub fn screaming_ident(name: &str) -> Ident {
    safe_ident(&to_screaming_snake(name))
}

fn safe_ident(name: &str) -> Ident {
    if is_keyword(name) {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "async"
            | "await"
            | "break"
            | "const"
            | "continue"
            | "dyn"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "gen"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "static"
            | "struct"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "yield"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_doc_comment() {
        let doc = generate_doc_comment(Some("This is a test.\nSecond line."));
        let code = doc.to_string();
        assert!(code.contains("This is a test"));
        assert!(code.contains("Second line"));
    }

    #[test]
    fn test_generate_doc_comment_none() {
        let doc = generate_doc_comment(None);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_snake_ident() {
        assert_eq!(snake_ident("TwitterUser").to_string(), "twitter_user");
        assert_eq!(snake_ident("providerAccountId").to_string(), "provider_account_id");
    }

    #[test]
    fn test_keywords_are_raw() {
        assert_eq!(snake_ident("type").to_string(), "r#type");
        assert_eq!(pascal_ident("type").to_string(), "Type");
    }

    #[test]
    fn test_screaming_ident() {
        assert_eq!(screaming_ident("latestTweetsQuery").to_string(), "LATEST_TWEETS_QUERY");
    }
}
