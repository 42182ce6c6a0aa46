//! The client facade and the `ModelName` enum.

use proc_macro2::TokenStream;
use quote::quote;

use reportdb_schema::ast::Schema;

use super::{pascal_ident, snake_ident};

/// `ModelName`: one variant per model.
pub fn generate_model_name(schema: &Schema) -> TokenStream {
    let variants: Vec<_> = schema.models.values().map(|m| pascal_ident(m.name())).collect();
    let names: Vec<_> = schema.models.values().map(|m| m.name().to_string()).collect();
    let count = variants.len();

    quote! {
        /// Every model in the schema.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ModelName {
            #(#variants,)*
        }

        impl ModelName {
            /// Every model, in schema order.
            pub const ALL: [ModelName; #count] = [#(Self::#variants),*];

            /// The model name as written in the schema.
            pub fn as_str(&self) -> &'static str {
                match self {
                    #(Self::#variants => #names,)*
                }
            }
        }

        impl ::std::fmt::Display for ModelName {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    }
}

/// `Client<E>`: one delegate getter per model plus the schema-independent
/// surface of `ClientCore`.
pub fn generate_client(schema: &Schema) -> TokenStream {
    let getters = schema.models.values().map(|model| {
        let method = snake_ident(model.name());
        let module = snake_ident(model.name());
        let payload = pascal_ident(model.name());
        let doc = format!("Queries on `{}`.", model.name());
        quote! {
            #[doc = #doc]
            pub fn #method(&self) -> ::reportdb_query::Delegate<::reportdb_query::Instrumented<E>, #module::#payload> {
                self.core.delegate()
            }
        }
    });

    quote! {
        /// The database client.
        ///
        /// Cloning is cheap: clones share the engine, the options and the
        /// event subscribers.
        pub struct Client<E: ::reportdb_query::QueryEngine> {
            core: ::reportdb_query::ClientCore<E>,
        }

        impl<E: ::reportdb_query::QueryEngine> Client<E> {
            /// Create a client over `engine`.
            pub fn new(engine: E, options: ::reportdb_query::ClientOptions) -> Self {
                Self::from_core(::reportdb_query::ClientCore::new(engine, options))
            }

            /// Wrap an existing client core.
            pub fn from_core(core: ::reportdb_query::ClientCore<E>) -> Self {
                Self { core }
            }

            /// The schema-independent client.
            pub fn core(&self) -> &::reportdb_query::ClientCore<E> {
                &self.core
            }

            #(#getters)*

            /// Connect the engine.
            pub async fn connect(&self) -> ::reportdb_query::QueryResult<()> {
                self.core.connect().await
            }

            /// Disconnect the engine.
            pub async fn disconnect(&self) -> ::reportdb_query::QueryResult<()> {
                self.core.disconnect().await
            }

            /// Run `body` in an interactive transaction with the default
            /// configuration. `Ok` commits, `Err` rolls back.
            pub async fn transaction<T, F, Fut>(&self, body: F) -> ::reportdb_query::QueryResult<T>
            where
                F: FnOnce(Client<E>) -> Fut,
                Fut: ::std::future::Future<Output = ::reportdb_query::QueryResult<T>>,
            {
                self.core.transaction(|core| body(Client::from_core(core))).await
            }

            /// Run `body` in an interactive transaction with `config`.
            pub async fn transaction_with<T, F, Fut>(
                &self,
                config: ::reportdb_query::TransactionConfig,
                body: F,
            ) -> ::reportdb_query::QueryResult<T>
            where
                F: FnOnce(Client<E>) -> Fut,
                Fut: ::std::future::Future<Output = ::reportdb_query::QueryResult<T>>,
            {
                self.core
                    .transaction_with(config, |core| body(Client::from_core(core)))
                    .await
            }

            /// Run prepared statements atomically; returns the rows of each.
            pub async fn batch(
                &self,
                statements: impl IntoIterator<Item = ::reportdb_query::Statement>,
            ) -> ::reportdb_query::QueryResult<Vec<Vec<::reportdb_query::Row>>> {
                self.core.batch(statements).await
            }

            /// Run a parameterized raw query.
            pub async fn query_raw(&self, sql: ::reportdb_query::Sql) -> ::reportdb_query::QueryResult<Vec<::reportdb_query::Row>> {
                self.core.query_raw(sql).await
            }

            /// Run a parameterized raw query and decode the rows.
            pub async fn query_raw_as<T: ::serde::de::DeserializeOwned>(
                &self,
                sql: ::reportdb_query::Sql,
            ) -> ::reportdb_query::QueryResult<Vec<T>> {
                self.core.query_raw_as(sql).await
            }

            /// Run a raw query from a SQL string and explicit parameters.
            pub async fn query_raw_unsafe(
                &self,
                sql: &str,
                params: Vec<::reportdb_query::FilterValue>,
            ) -> ::reportdb_query::QueryResult<Vec<::reportdb_query::Row>> {
                self.core.query_raw_unsafe(sql, params).await
            }

            /// Run a parameterized raw statement; returns the affected row count.
            pub async fn execute_raw(&self, sql: ::reportdb_query::Sql) -> ::reportdb_query::QueryResult<u64> {
                self.core.execute_raw(sql).await
            }

            /// Run a raw statement from a SQL string and explicit parameters.
            pub async fn execute_raw_unsafe(
                &self,
                sql: &str,
                params: Vec<::reportdb_query::FilterValue>,
            ) -> ::reportdb_query::QueryResult<u64> {
                self.core.execute_raw_unsafe(sql, params).await
            }

            /// A client whose queries pass through `extension`.
            pub fn extends(&self, extension: impl ::reportdb_query::QueryExtension + 'static) -> Self {
                Self::from_core(self.core.extends(extension))
            }

            /// Subscribe to events of `level`.
            pub fn on(
                &self,
                level: ::reportdb_query::LogLevel,
                callback: impl Fn(&::reportdb_query::Event) + Send + Sync + 'static,
            ) {
                self.core.on(level, callback)
            }
        }

        impl<E: ::reportdb_query::QueryEngine> Clone for Client<E> {
            fn clone(&self) -> Self {
                Self::from_core(self.core.clone())
            }
        }

        impl<E: ::reportdb_query::QueryEngine> ::std::fmt::Debug for Client<E> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct("Client").field("core", &self.core).finish()
            }
        }
    }
}
