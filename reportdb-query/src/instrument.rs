//! The engine wrapper every client talks through.
//!
//! [`Instrumented`] runs each statement through the extension chain, times
//! it, reports it to the configured log outputs and turns a panic inside the
//! driver into a `RustPanic` error.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error};

use crate::error::{QueryError, QueryResult};
use crate::events::{EventEmitter, LogLevel};
use crate::extension::{ExtensionChain, QueryContext, QueryExtension, QueryKind, QueryOutput};
use crate::filter::FilterValue;
use crate::sql::Statement;
use crate::traits::{BoxFuture, QueryEngine, Row};
use crate::transaction::TransactionConfig;

/// A driver engine with extensions, logging and panic isolation.
#[derive(Debug, Clone)]
pub struct Instrumented<E> {
    engine: E,
    extensions: ExtensionChain,
    events: EventEmitter,
}

impl<E: QueryEngine> Instrumented<E> {
    /// Wrap `engine`.
    pub fn new(engine: E, events: EventEmitter) -> Self {
        Self {
            engine,
            extensions: ExtensionChain::new(),
            events,
        }
    }

    /// A copy with `extension` appended to the chain.
    pub fn with_extension(&self, extension: impl QueryExtension + 'static) -> Self {
        Self {
            engine: self.engine.clone(),
            extensions: self.extensions.with(extension),
            events: self.events.clone(),
        }
    }

    /// The driver engine.
    pub fn inner(&self) -> &E {
        &self.engine
    }

    /// The extension chain.
    pub fn extensions(&self) -> &ExtensionChain {
        &self.extensions
    }

    /// The log router.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    fn dispatch(&self, ctx: QueryContext) -> BoxFuture<'_, QueryResult<QueryOutput>> {
        self.extensions.execute(ctx, move |ctx| {
            let fut: BoxFuture<'_, QueryResult<QueryOutput>> = Box::pin(self.run_engine(ctx));
            fut
        })
    }

    async fn run_engine(&self, ctx: QueryContext) -> QueryResult<QueryOutput> {
        let QueryContext { statement, kind } = ctx;
        let Statement { sql, params } = statement;
        debug!(sql = %sql, params = params.len(), "Executing statement");

        let timestamp = Utc::now();
        let started = Instant::now();
        let result = match kind {
            QueryKind::Query => catch_panic(self.engine.query(&sql, params.clone()))
                .await
                .map(QueryOutput::Rows),
            QueryKind::Execute => catch_panic(self.engine.execute(&sql, params.clone()))
                .await
                .map(QueryOutput::Affected),
        };
        let elapsed = started.elapsed();

        self.events.query(&sql, &params, elapsed, timestamp);
        if let Err(err) = &result {
            error!(sql = %sql, error = %err, "Statement failed");
            self.events.log(LogLevel::Error, "query", err.to_string());
        }
        result
    }
}

impl<E: QueryEngine> QueryEngine for Instrumented<E> {
    fn query(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let ctx = QueryContext::new(Statement::new(sql, params), QueryKind::Query);
        Box::pin(async move { self.dispatch(ctx).await.map(QueryOutput::into_rows) })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let ctx = QueryContext::new(Statement::new(sql, params), QueryKind::Execute);
        Box::pin(async move { self.dispatch(ctx).await.map(|output| output.affected()) })
    }

    fn connect(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(catch_panic(self.engine.connect()))
    }

    fn disconnect(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(catch_panic(self.engine.disconnect()))
    }

    fn begin(&self, config: &TransactionConfig) -> BoxFuture<'_, QueryResult<Self>> {
        let begin = self.engine.begin(config);
        Box::pin(async move {
            let engine = catch_panic(begin).await?;
            Ok(Self {
                engine,
                extensions: self.extensions.clone(),
                events: self.events.clone(),
            })
        })
    }

    fn commit(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(catch_panic(self.engine.commit()))
    }

    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(catch_panic(self.engine.rollback()))
    }
}

async fn catch_panic<T>(fut: impl Future<Output = QueryResult<T>>) -> QueryResult<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "Engine panicked");
            Err(QueryError::panic(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::error::ErrorKind;
    use crate::events::{ClientOptions, EmitMode, Event};
    use crate::extension::rewrite_statement;
    use crate::testing::MockEngine;

    fn instrumented(engine: &MockEngine, options: ClientOptions) -> Instrumented<MockEngine> {
        Instrumented::new(engine.clone(), EventEmitter::new(options))
    }

    #[tokio::test]
    async fn test_passes_statements_through() {
        let engine = MockEngine::new();
        engine.push_rows([json!({"id": "u1"})]);
        let wrapped = instrumented(&engine, ClientOptions::new());

        let rows = wrapped.query("SELECT 1", vec![1.into()]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(engine.last_statement().unwrap().params, vec![FilterValue::Int(1)]);
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let engine = MockEngine::new();
        engine.push_panic("driver exploded");
        let wrapped = instrumented(&engine, ClientOptions::new());

        let err = wrapped.query("SELECT 1", vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RustPanic);
        assert!(err.message.contains("driver exploded"));
    }

    #[tokio::test]
    async fn test_query_events_are_emitted() {
        let engine = MockEngine::new().with_latency(Duration::from_millis(5));
        let wrapped = instrumented(
            &engine,
            ClientOptions::new().log(LogLevel::Query, EmitMode::Event),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        wrapped
            .events()
            .bus()
            .subscribe(LogLevel::Query, move |e| sink.lock().push(e.clone()));

        wrapped.execute("DELETE FROM \"Post\"", vec![]).await.unwrap();

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        let Event::Query(query) = &events[0] else {
            panic!("expected a query event");
        };
        assert_eq!(query.query, "DELETE FROM \"Post\"");
        assert!(query.duration >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_extensions_rewrite_statements() {
        let engine = MockEngine::new();
        let wrapped = instrumented(&engine, ClientOptions::new())
            .with_extension(rewrite_statement("tag", |s: &mut Statement| s.sql.push_str(" -- tagged")));

        wrapped.execute("SELECT 1", vec![]).await.unwrap();
        assert_eq!(engine.executed_sql(), vec!["SELECT 1 -- tagged"]);
    }

    #[tokio::test]
    async fn test_transaction_engine_keeps_extensions() {
        let engine = MockEngine::new();
        let wrapped = instrumented(&engine, ClientOptions::new())
            .with_extension(rewrite_statement("tag", |s: &mut Statement| s.sql.push_str(" -- tx")));

        let tx = wrapped.begin(&TransactionConfig::new()).await.unwrap();
        tx.execute("UPDATE", vec![]).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(engine.executed_sql(), vec!["BEGIN", "UPDATE -- tx", "COMMIT"]);
        assert_eq!(tx.extensions().len(), 1);
    }
}
