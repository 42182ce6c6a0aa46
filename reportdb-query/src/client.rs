//! The client core shared by every generated client.
//!
//! Generated code wraps [`ClientCore`] in a `Client<E>` with one getter per
//! model. Everything that does not depend on the schema lives here:
//! connection lifecycle, transactions, batches, raw SQL, extensions and
//! event subscriptions.
//!
//! ```rust,ignore
//! let client = Client::new(PgEngine::connect(&url).await?, ClientOptions::new()
//!     .log(LogLevel::Query, EmitMode::Event)
//!     .log(LogLevel::Warn, EmitMode::Stdout));
//!
//! client.on(LogLevel::Query, |event| println!("{:?}", event));
//! client.connect().await?;
//! ```

use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::delegate::Delegate;
use crate::error::QueryResult;
use crate::events::{ClientOptions, Event, EventEmitter, LogLevel};
use crate::extension::QueryExtension;
use crate::filter::FilterValue;
use crate::instrument::Instrumented;
use crate::raw::{self, Sql};
use crate::sql::Statement;
use crate::traits::{Model, QueryEngine, Row};
use crate::transaction::{TransactionConfig, run_transaction};

/// Schema-independent client state.
///
/// Cloning is cheap; clones share the engine, the extension chain and the
/// event subscribers.
#[derive(Clone)]
pub struct ClientCore<E: QueryEngine> {
    engine: Instrumented<E>,
}

impl<E: QueryEngine> ClientCore<E> {
    /// Create a client over a driver engine.
    pub fn new(engine: E, options: ClientOptions) -> Self {
        Self {
            engine: Instrumented::new(engine, EventEmitter::new(options)),
        }
    }

    /// Wrap an already instrumented engine (a transaction engine, for instance).
    pub fn from_engine(engine: Instrumented<E>) -> Self {
        Self { engine }
    }

    /// The instrumented engine operations run on.
    pub fn engine(&self) -> &Instrumented<E> {
        &self.engine
    }

    /// The options the client was built with.
    pub fn options(&self) -> &ClientOptions {
        self.engine.events().options()
    }

    /// The delegate of model `M`.
    pub fn delegate<M: Model>(&self) -> Delegate<Instrumented<E>, M> {
        Delegate::new(self.engine.clone())
    }

    /// Connect eagerly instead of on first use.
    pub async fn connect(&self) -> QueryResult<()> {
        self.engine.connect().await?;
        info!("Client connected");
        self.engine.events().log(LogLevel::Info, "client", "connected");
        Ok(())
    }

    /// Close the connection.
    pub async fn disconnect(&self) -> QueryResult<()> {
        self.engine.disconnect().await?;
        info!("Client disconnected");
        self.engine.events().log(LogLevel::Info, "client", "disconnected");
        Ok(())
    }

    /// Run `body` in an interactive transaction with the client's default
    /// transaction settings.
    pub async fn transaction<T, F, Fut>(&self, body: F) -> QueryResult<T>
    where
        F: FnOnce(ClientCore<E>) -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        let config = self.options().transaction;
        self.transaction_with(config, body).await
    }

    /// Run `body` in an interactive transaction.
    ///
    /// The body gets a client bound to the transaction. It commits when the
    /// body returns `Ok` and rolls back on `Err`, on timeout, or when the
    /// transaction cannot be started within `max_wait`.
    pub async fn transaction_with<T, F, Fut>(&self, config: TransactionConfig, body: F) -> QueryResult<T>
    where
        F: FnOnce(ClientCore<E>) -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        let result = run_transaction(&self.engine, &config, |tx| body(ClientCore::from_engine(tx))).await;
        if let Err(err) = &result {
            self.engine
                .events()
                .log(LogLevel::Warn, "transaction", format!("transaction failed: {}", err));
        }
        result
    }

    /// Run prepared statements atomically and return the rows of each.
    ///
    /// Build the statements with the `build_sql()` of any operation or with
    /// [`Sql`]. The first failure rolls back everything.
    pub async fn batch(&self, statements: impl IntoIterator<Item = Statement>) -> QueryResult<Vec<Vec<Row>>> {
        let statements: Vec<Statement> = statements.into_iter().collect();
        if statements.is_empty() {
            return Ok(Vec::new());
        }
        debug!(statements = statements.len(), "Running batch");
        let config = self.options().transaction;
        self.transaction_with(config, |tx| async move {
            let mut results = Vec::with_capacity(statements.len());
            for Statement { sql, params } in statements {
                results.push(tx.engine.query(&sql, params).await?);
            }
            Ok(results)
        })
        .await
    }

    /// Run a parameterized raw query.
    pub async fn query_raw(&self, sql: Sql) -> QueryResult<Vec<Row>> {
        raw::query_raw(&self.engine, sql.into()).await
    }

    /// Run a parameterized raw query and decode every row into `T`.
    pub async fn query_raw_as<T: DeserializeOwned>(&self, sql: Sql) -> QueryResult<Vec<T>> {
        raw::query_raw_as(&self.engine, sql.into()).await
    }

    /// Run a raw query given as plain text with `$n` placeholders.
    ///
    /// The text is sent as is; never build it from untrusted input.
    pub async fn query_raw_unsafe(&self, sql: &str, params: Vec<FilterValue>) -> QueryResult<Vec<Row>> {
        raw::query_raw(&self.engine, Statement::new(sql, params)).await
    }

    /// Run a parameterized raw statement and return the affected-row count.
    pub async fn execute_raw(&self, sql: Sql) -> QueryResult<u64> {
        raw::execute_raw(&self.engine, sql.into()).await
    }

    /// Run a raw statement given as plain text with `$n` placeholders.
    ///
    /// The text is sent as is; never build it from untrusted input.
    pub async fn execute_raw_unsafe(&self, sql: &str, params: Vec<FilterValue>) -> QueryResult<u64> {
        raw::execute_raw(&self.engine, Statement::new(sql, params)).await
    }

    /// A client with `extension` added to the query chain.
    ///
    /// The original client is unchanged.
    pub fn extends(&self, extension: impl QueryExtension + 'static) -> Self {
        Self {
            engine: self.engine.with_extension(extension),
        }
    }

    /// Subscribe to events of `level`.
    ///
    /// Only levels configured with `EmitMode::Event` produce events.
    pub fn on(&self, level: LogLevel, callback: impl Fn(&Event) + Send + Sync + 'static) {
        if self.options().emit_mode(level) != Some(crate::events::EmitMode::Event) {
            warn!(level = %level, "Subscribed to a level that is not emitted as events");
        }
        self.engine.events().bus().subscribe(level, callback);
    }
}

impl<E: QueryEngine> fmt::Debug for ClientCore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCore")
            .field("extensions", self.engine.extensions())
            .field("options", self.options())
            .finish()
    }
}
