//! Procedural macros for reportdb.
//!
//! # Macros
//!
//! - [`reportdb_schema!`] - Generate the client from a `.rdb` schema file
//!
//! # Example
//!
//! ```rust,ignore
//! reportdb_macros::reportdb_schema!("db/schema.rdb");
//!
//! let user = client
//!     .user()
//!     .find_unique(user::UniqueWhere::Id(id))
//!     .exec()
//!     .await?;
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{LitStr, parse_macro_input};

/// Generate the client from a schema file.
///
/// The path is resolved against `CARGO_MANIFEST_DIR` of the invoking crate.
/// Parse and validation errors become compile errors listing every problem.
///
/// For each model this generates a snake_case module holding:
/// - the payload struct and its `Model` impl
/// - `UniqueWhere`, `CreateInput` and `UpdateInput`
/// - one module per scalar field with filter and ordering builders
/// - one module per relation field with relation filters and includes
///
/// It also generates `ModelName` and `Client<E>`.
#[proc_macro]
pub fn reportdb_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LitStr);

    match generate_from_schema(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_from_schema(path: &LitStr) -> syn::Result<proc_macro2::TokenStream> {
    let schema = reportdb_codegen::read_schema(&path.value())
        .map_err(|e| syn::Error::new(path.span(), e.to_string()))?;

    let generated = reportdb_codegen::generate(&schema)?;
    let rebuild = rebuild_trigger(&path.value());

    Ok(quote! {
        #rebuild
        #generated
    })
}

/// Make the invoking crate recompile when the schema file changes.
fn rebuild_trigger(path: &str) -> proc_macro2::TokenStream {
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return proc_macro2::TokenStream::new();
    };
    let full_path = std::path::Path::new(&manifest_dir).join(path);
    if !full_path.exists() {
        return proc_macro2::TokenStream::new();
    }
    let full_path = full_path.display().to_string();
    quote! {
        const _: &[u8] = include_bytes!(#full_path);
    }
}
