//! Code generation for the reportdb client.
//!
//! This crate turns a validated [`Schema`] into Rust source: one module per
//! model (payload, metadata, inputs, field and relation handles), the
//! `ModelName` enum and a `Client<E>` facade with one delegate per model.
//!
//! It is a plain library. The `reportdb_schema!` macro in `reportdb-macros`
//! calls [`generate`] at compile time and the CLI calls [`generate_source`]
//! to write the code to disk.
//!
//! # Example
//!
//! ```rust
//! use reportdb_schema::validate_schema;
//!
//! let schema = validate_schema(r#"
//!     model TezosWallet {
//!         id      String @id @default(uuid())
//!         address String @unique
//!     }
//! "#).unwrap();
//!
//! let source = reportdb_codegen::generate_source(&schema).unwrap();
//! assert!(source.contains("pub mod tezos_wallet"));
//! assert!(source.contains("pub struct Client"));
//! ```

use proc_macro2::TokenStream;
use reportdb_schema::Schema;

mod generators;
mod schema_reader;
mod types;

pub use generators::{generate_client, generate_model_module, generate_model_name};
pub use schema_reader::{SchemaReadError, read_schema};

/// Generate the complete client code for `schema`.
pub fn generate(schema: &Schema) -> syn::Result<TokenStream> {
    let mut output = generate_model_name(schema);

    for model in schema.models.values() {
        output.extend(generate_model_module(model, schema)?);
    }

    output.extend(generate_client(schema));
    Ok(output)
}

/// Generate the client code for `schema` as formatted source text.
///
/// Falls back to the raw token text if the tokens do not form a valid file.
pub fn generate_source(schema: &Schema) -> syn::Result<String> {
    let tokens = generate(schema)?;
    let source = match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => prettyplease::unparse(&file),
        Err(_) => tokens.to_string(),
    };
    Ok(source)
}
